//! Error taxonomy and HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::domain::status::OrderStatus;

/// Rejected status-machine transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("delivered orders cannot be cancelled")]
    DeliveredOrdersCannotBeCancelled,

    #[error("cannot transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("order is already {0}")]
    AlreadyInStatus(OrderStatus),
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order must contain at least one item")]
    EmptyOrder,

    #[error("insufficient stock for {product}: {available} available")]
    InsufficientStock { product: String, available: i32 },

    #[error("quantity must be a positive integer")]
    InvalidQuantity,

    #[error("price must not be negative")]
    InvalidPrice,

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("order not found")]
    OrderNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("order item not found")]
    ItemNotFound,

    #[error("order is {0} and can no longer be modified")]
    OrderClosed(OrderStatus),

    #[error("order does not belong to the requesting user")]
    NotOwned,

    #[error("missing or invalid user identity")]
    Unauthenticated,

    #[error("a different payment was already recorded for this order")]
    PaymentRecordingConflict,

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),

    #[error("transaction failed: {0}")]
    TransactionFailed(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, OrderError>;

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = match &self {
            OrderError::EmptyOrder
            | OrderError::InsufficientStock { .. }
            | OrderError::InvalidQuantity
            | OrderError::InvalidPrice
            | OrderError::PaymentDeclined(_)
            | OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::OrderNotFound | OrderError::ProductNotFound | OrderError::ItemNotFound => {
                StatusCode::NOT_FOUND
            }
            OrderError::NotOwned => StatusCode::FORBIDDEN,
            OrderError::Unauthenticated => StatusCode::UNAUTHORIZED,
            OrderError::InvalidTransition(_)
            | OrderError::OrderClosed(_)
            | OrderError::PaymentRecordingConflict => StatusCode::CONFLICT,
            OrderError::TransactionFailed(e) => {
                tracing::error!(error = %e, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_names_product_and_shortfall() {
        let err = OrderError::InsufficientStock { product: "Product 2".into(), available: 5 };
        assert_eq!(err.to_string(), "insufficient stock for Product 2: 5 available");
    }

    #[test]
    fn delivered_cancellation_message() {
        let err = OrderError::from(TransitionError::DeliveredOrdersCannotBeCancelled);
        assert_eq!(err.to_string(), "delivered orders cannot be cancelled");
    }
}
