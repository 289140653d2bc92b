//! Inventory ledger: exclusive owner of per-product stock counters.
//!
//! `reserve` serializes competing checkouts on the product row with
//! `SELECT ... FOR UPDATE`; the decrement happens inside the same
//! critical section, so two racing reservations for the last units
//! cannot both succeed. `release` is a single-statement increment used
//! for checkout compensation and cancellation restock.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::ProductSnapshot;
use crate::error::{OrderError, Result};

/// A successful reservation: quantity is already decremented from the
/// product's stock. Carries the locked row's name, price, and
/// pre-decrement stock for price capture and auditing.
#[derive(Clone, Debug)]
pub struct ReservedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub stock_before: i32,
}

impl ReservedLine {
    /// The product as observed under the row lock.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.product_id,
            name: self.product_name.clone(),
            price: self.unit_price,
            stock: self.stock_before,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LockedProduct {
    name: String,
    price: Decimal,
    stock: i32,
}

/// Atomically checks and decrements available stock for one product.
///
/// Holds the row lock until the enclosing transaction commits or rolls
/// back. Fails with `InsufficientStock` without mutating state when the
/// requested quantity exceeds what is available.
pub async fn reserve(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    quantity: i32,
) -> Result<ReservedLine> {
    let row = sqlx::query_as::<_, LockedProduct>(
        "SELECT name, price, stock FROM products WHERE id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(OrderError::ProductNotFound)?;

    if quantity > row.stock {
        return Err(OrderError::InsufficientStock { product: row.name, available: row.stock });
    }

    sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1")
        .bind(product_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;

    tracing::debug!(%product_id, quantity, stock_before = row.stock, "reserved stock");
    Ok(ReservedLine {
        product_id,
        product_name: row.name,
        unit_price: row.price,
        quantity,
        stock_before: row.stock,
    })
}

/// Returns reserved quantity to the product's stock. The increment is a
/// single statement, safe against concurrent mutation of the counter.
pub async fn release<'e, E>(executor: E, product_id: Uuid, quantity: i32) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result =
        sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .bind(quantity)
            .execute(executor)
            .await?;
    if result.rows_affected() == 0 {
        return Err(OrderError::ProductNotFound);
    }
    tracing::debug!(%product_id, quantity, "released stock");
    Ok(())
}

/// Unlocked read of the products referenced by a checkout, used for the
/// fast-fail pre-check. Values may be stale by the time locks are taken;
/// `reserve` stays authoritative.
pub async fn visible_snapshots(db: &PgPool, product_ids: &[Uuid]) -> Result<Vec<ProductSnapshot>> {
    let rows = sqlx::query_as::<_, (Uuid, String, Decimal, i32)>(
        "SELECT id, name, price, stock FROM products WHERE id = ANY($1)",
    )
    .bind(product_ids)
    .fetch_all(db)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name, price, stock)| ProductSnapshot { id, name, price, stock })
        .collect())
}
