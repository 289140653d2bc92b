//! Shoply — self-hosted e-commerce order service.
//!
//! ## Features
//! - Product catalog CRUD
//! - Inventory-aware checkout with row-level stock locking
//! - Order lifecycle state machine with an append-only status history
//! - Simulated payment and refund flows
//!
//! The interesting part is the checkout path: [`checkout::place_order`]
//! reserves stock through the [`inventory`] ledger inside one
//! transaction, so concurrent checkouts against the same product cannot
//! oversell, and a failed line unwinds every earlier reservation.

pub mod api;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod error;
pub mod inventory;
pub mod orders;
pub mod payments;

pub use config::Config;
pub use error::{OrderError, Result};
