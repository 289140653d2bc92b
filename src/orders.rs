//! Order lifecycle service: status transitions, payment recording,
//! cancellation with refund and restock, and user-scoped reads.
//!
//! Every transition goes through [`transition`], the only writer of
//! `order_status_history`, so one accepted transition produces exactly
//! one history row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::order::{LineItem, OrderAggregate};
use crate::domain::status::{refund_reference, OrderStatus, PaymentStatus};
use crate::error::{OrderError, Result};
use crate::inventory;

pub use crate::domain::status::ChargeOutcome;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub payment_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub is_refunded: bool,
    pub refund_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusHistory {
    pub id: Uuid,
    pub order_id: Uuid,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Result of an accepted status transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub order: Order,
    pub previous: OrderStatus,
}

async fn lock_order(tx: &mut Transaction<'_, Postgres>, order_id: Uuid) -> Result<Order> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(OrderError::OrderNotFound)
}

/// Applies a validated status change and appends its history row, both
/// within the caller's transaction.
async fn transition(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
    new_status: OrderStatus,
) -> Result<Order> {
    order.status.validate_transition(new_status)?;
    let updated = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(order.id)
    .bind(new_status)
    .fetch_one(&mut **tx)
    .await?;
    sqlx::query(
        "INSERT INTO order_status_history (id, order_id, previous_status, new_status, changed_at) \
         VALUES ($1, $2, $3, $4, NOW())",
    )
    .bind(Uuid::now_v7())
    .bind(order.id)
    .bind(order.status)
    .bind(new_status)
    .execute(&mut **tx)
    .await?;
    Ok(updated)
}

pub async fn set_status(
    db: &PgPool,
    order_id: Uuid,
    new_status: OrderStatus,
) -> Result<StatusChange> {
    let mut tx = db.begin().await?;
    let order = lock_order(&mut tx, order_id).await?;
    let previous = order.status;
    let updated = transition(&mut tx, &order, new_status).await?;
    tx.commit().await?;
    tracing::info!(%order_id, %previous, status = %new_status, "order status changed");
    Ok(StatusChange { order: updated, previous })
}

/// Cancels an order: validates the transition, restocks every line item,
/// and marks a paid order refunded with a deterministic refund id.
pub async fn cancel(db: &PgPool, order_id: Uuid) -> Result<StatusChange> {
    let mut tx = db.begin().await?;
    let order = lock_order(&mut tx, order_id).await?;
    let previous = order.status;
    let mut updated = transition(&mut tx, &order, OrderStatus::Cancelled).await?;

    let items: Vec<(Uuid, i32)> =
        sqlx::query_as("SELECT product_id, quantity FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .fetch_all(&mut *tx)
            .await?;
    for (product_id, quantity) in items {
        inventory::release(&mut *tx, product_id, quantity).await?;
    }

    if order.is_paid {
        updated = sqlx::query_as::<_, Order>(
            "UPDATE orders SET is_refunded = TRUE, refund_id = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(order_id)
        .bind(refund_reference(order_id))
        .fetch_one(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(%order_id, refunded = updated.is_refunded, "order cancelled");
    Ok(StatusChange { order: updated, previous })
}

/// Records a charge outcome reported by the payment collaborator.
///
/// Reporting the same charge against an already-paid order is a no-op;
/// a different charge id is a conflict. Success advances the order to
/// processing through the status machine.
pub async fn record_payment(
    db: &PgPool,
    order_id: Uuid,
    charge_id: &str,
    outcome: ChargeOutcome,
) -> Result<Order> {
    let mut tx = db.begin().await?;
    let order = lock_order(&mut tx, order_id).await?;

    if order.is_paid {
        return if order.payment_id.as_deref() == Some(charge_id) {
            tx.rollback().await?;
            Ok(order)
        } else {
            Err(OrderError::PaymentRecordingConflict)
        };
    }

    let updated = match outcome {
        ChargeOutcome::Success => {
            let paid = sqlx::query_as::<_, Order>(
                "UPDATE orders SET payment_id = $2, payment_status = $3, is_paid = TRUE, \
                 updated_at = NOW() WHERE id = $1 RETURNING *",
            )
            .bind(order_id)
            .bind(charge_id)
            .bind(PaymentStatus::Paid)
            .fetch_one(&mut *tx)
            .await?;
            transition(&mut tx, &paid, OrderStatus::Processing).await?
        }
        ChargeOutcome::Failure => {
            sqlx::query_as::<_, Order>(
                "UPDATE orders SET payment_id = $2, payment_status = $3, updated_at = NOW() \
                 WHERE id = $1 RETURNING *",
            )
            .bind(order_id)
            .bind(charge_id)
            .bind(PaymentStatus::Failed)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    tx.commit().await?;
    tracing::info!(%order_id, charge_id, ?outcome, "payment recorded");
    Ok(updated)
}

/// Administrative correction: attaches one more line item to an existing
/// order, reserving stock and recomputing the total in one transaction.
/// Terminal orders are closed to corrections; cancellation has already
/// returned their stock to the ledger.
pub async fn add_item(
    db: &PgPool,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price_override: Option<Decimal>,
) -> Result<OrderDetail> {
    let mut tx = db.begin().await?;
    let order = lock_order(&mut tx, order_id).await?;
    if order.status.is_terminal() {
        return Err(OrderError::OrderClosed(order.status));
    }
    let reserved = inventory::reserve(&mut tx, product_id, quantity).await?;
    let mut aggregate = OrderAggregate::with_items(load_items_tx(&mut tx, order_id).await?);
    let item = aggregate.attach_item(&reserved.snapshot(), quantity, price_override)?;
    sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, quantity, price) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::now_v7())
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .execute(&mut *tx)
    .await?;
    let order = persist_total(&mut tx, order_id, aggregate.recompute_total()).await?;
    tx.commit().await?;
    let items = load_items(db, order_id).await?;
    Ok(OrderDetail { order, items })
}

/// Administrative correction: removes a line item, releasing its stock
/// and recomputing the total in one transaction.
pub async fn remove_item(db: &PgPool, order_id: Uuid, item_id: Uuid) -> Result<OrderDetail> {
    let mut tx = db.begin().await?;
    let order = lock_order(&mut tx, order_id).await?;
    if order.status.is_terminal() {
        return Err(OrderError::OrderClosed(order.status));
    }
    let removed: Option<(Uuid, i32)> = sqlx::query_as(
        "DELETE FROM order_items WHERE id = $1 AND order_id = $2 RETURNING product_id, quantity",
    )
    .bind(item_id)
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some((product_id, quantity)) = removed else {
        return Err(OrderError::ItemNotFound);
    };
    inventory::release(&mut *tx, product_id, quantity).await?;
    let aggregate = OrderAggregate::with_items(load_items_tx(&mut tx, order_id).await?);
    let order = persist_total(&mut tx, order_id, aggregate.recompute_total()).await?;
    tx.commit().await?;
    let items = load_items(db, order_id).await?;
    Ok(OrderDetail { order, items })
}

async fn persist_total(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    total: Decimal,
) -> Result<Order> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET total_price = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(order_id)
    .bind(total)
    .fetch_one(&mut **tx)
    .await?;
    Ok(order)
}

async fn load_items_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<Vec<LineItem>> {
    let rows: Vec<(Uuid, String, i32, Decimal)> = sqlx::query_as(
        "SELECT oi.product_id, p.name, oi.quantity, oi.price \
         FROM order_items oi JOIN products p ON p.id = oi.product_id \
         WHERE oi.order_id = $1 ORDER BY oi.id",
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(product_id, product_name, quantity, unit_price)| LineItem {
            product_id,
            product_name,
            quantity,
            unit_price,
        })
        .collect())
}

pub async fn get(db: &PgPool, order_id: Uuid, user_id: Uuid) -> Result<OrderDetail> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(db)
        .await?
        .ok_or(OrderError::OrderNotFound)?;
    if order.user_id != user_id {
        return Err(OrderError::NotOwned);
    }
    let items = load_items(db, order_id).await?;
    Ok(OrderDetail { order, items })
}

pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    page: u32,
    per_page: u32,
) -> Result<(Vec<Order>, i64)> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(per_page as i64)
    .bind((page as i64 - 1) * per_page as i64)
    .fetch_all(db)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok((orders, total.0))
}

pub async fn history(db: &PgPool, order_id: Uuid, user_id: Uuid) -> Result<Vec<StatusHistory>> {
    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT user_id FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(db)
        .await?;
    match owner {
        None => return Err(OrderError::OrderNotFound),
        Some((owner_id,)) if owner_id != user_id => return Err(OrderError::NotOwned),
        Some(_) => {}
    }
    let rows = sqlx::query_as::<_, StatusHistory>(
        "SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY changed_at, id",
    )
    .bind(order_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub(crate) async fn load_items(db: &PgPool, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, oi.price \
         FROM order_items oi JOIN products p ON p.id = oi.product_id \
         WHERE oi.order_id = $1 ORDER BY oi.id",
    )
    .bind(order_id)
    .fetch_all(db)
    .await?;
    Ok(items)
}
