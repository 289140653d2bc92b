//! Domain events published to NATS when a client is configured.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::status::{ChargeOutcome, OrderStatus};

pub const SUBJECT: &str = "shoply.orders";

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    OrderPlaced { order_id: Uuid, user_id: Uuid, total: Decimal },
    StatusChanged { order_id: Uuid, previous: OrderStatus, new: OrderStatus },
    PaymentRecorded { order_id: Uuid, charge_id: String, outcome: ChargeOutcome },
    OrderCancelled { order_id: Uuid, refunded: bool },
}

/// Fire-and-forget publish; event delivery never fails a request.
pub async fn publish(nats: &Option<async_nats::Client>, event: &OrderEvent) {
    let Some(client) = nats else { return };
    let payload = match serde_json::to_vec(event) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize order event");
            return;
        }
    };
    if let Err(e) = client.publish(SUBJECT, payload.into()).await {
        tracing::warn!(error = %e, "failed to publish order event");
    }
}
