//! Pure domain logic: the order aggregate, the status machine, and the
//! events emitted when orders change.

pub mod events;
pub mod order;
pub mod status;

pub use order::{LineItem, OrderAggregate, ProductSnapshot};
pub use status::{refund_reference, ChargeOutcome, OrderStatus, PaymentStatus};
