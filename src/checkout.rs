//! Checkout transactor: all-or-nothing order placement.
//!
//! Either the full order exists with all stock decremented, or nothing
//! does. Reservation failures compensate earlier reservations in
//! reverse order and then roll the transaction back; the two mechanisms
//! overlap deliberately so partial application cannot survive either
//! path.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{OrderAggregate, ProductSnapshot};
use crate::error::{OrderError, Result};
use crate::inventory::{self, ReservedLine};
use crate::orders::{self, Order, OrderDetail};

/// One requested line: product, quantity, optional price override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Option<Decimal>,
}

/// Places an order for `user_id`. Lines are reserved in the order
/// submitted; on failure, already-reserved lines are released in
/// reverse before the rollback.
pub async fn place_order(db: &PgPool, user_id: Uuid, lines: &[LineRequest]) -> Result<OrderDetail> {
    if lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    // Fast fail on visible stock before any locks are taken. The
    // ledger's locked check below stays authoritative.
    precheck(db, lines).await?;

    let mut tx = db.begin().await?;
    let order_id = Uuid::now_v7();
    let order_number = format!("ORD-{:08}", rand::random::<u32>());
    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, created_at, updated_at) \
         VALUES ($1, $2, $3, NOW(), NOW())",
    )
    .bind(order_id)
    .bind(&order_number)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let mut aggregate = OrderAggregate::new();
    let mut reserved: Vec<ReservedLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match inventory::reserve(&mut tx, line.product_id, line.quantity).await {
            Ok(res) => {
                let item = aggregate.attach_item(&res.snapshot(), line.quantity, line.price)?;
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
                reserved.push(res);
            }
            Err(err @ OrderError::InsufficientStock { .. }) => {
                for prior in reserved.iter().rev() {
                    inventory::release(&mut *tx, prior.product_id, prior.quantity).await?;
                }
                tx.rollback().await?;
                tracing::warn!(%order_id, error = %err, "checkout aborted, reservations compensated");
                return Err(err);
            }
            // Dropping the transaction rolls everything back.
            Err(err) => return Err(err),
        }
    }

    let total = aggregate.recompute_total();
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET total_price = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(order_id)
    .bind(total)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(%order_id, %order_number, %total, lines = lines.len(), "order placed");
    let items = orders::load_items(db, order_id).await?;
    Ok(OrderDetail { order, items })
}

async fn precheck(db: &PgPool, lines: &[LineRequest]) -> Result<()> {
    let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let by_id: HashMap<Uuid, ProductSnapshot> = inventory::visible_snapshots(db, &ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut draft = OrderAggregate::new();
    for line in lines {
        let snapshot = by_id.get(&line.product_id).ok_or(OrderError::ProductNotFound)?;
        draft.attach_item(snapshot, line.quantity, line.price)?;
    }
    Ok(())
}
