//! Product catalog: thin CRUD over the products table.
//!
//! Stock is owned by the inventory ledger; catalog writes set the column
//! directly and are intended for administrative use, not checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{OrderError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list(db: &PgPool, page: u32, per_page: u32) -> Result<(Vec<Product>, i64)> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(per_page as i64)
    .bind((page as i64 - 1) * per_page as i64)
    .fetch_all(db)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(db).await?;
    Ok((products, total.0))
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Product> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(OrderError::ProductNotFound)
}

pub async fn create(
    db: &PgPool,
    name: &str,
    description: Option<&str>,
    price: Decimal,
    stock: i32,
) -> Result<Product> {
    if price < Decimal::ZERO {
        return Err(OrderError::InvalidPrice);
    }
    if stock < 0 {
        return Err(OrderError::InvalidQuantity);
    }
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, price, stock, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(stock)
    .fetch_one(db)
    .await?;
    Ok(product)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    name: &str,
    description: Option<&str>,
    price: Decimal,
    stock: i32,
) -> Result<Product> {
    if price < Decimal::ZERO {
        return Err(OrderError::InvalidPrice);
    }
    if stock < 0 {
        return Err(OrderError::InvalidQuantity);
    }
    sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, price = $4, stock = $5, \
         updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(stock)
    .fetch_optional(db)
    .await?
    .ok_or(OrderError::ProductNotFound)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(OrderError::ProductNotFound);
    }
    Ok(())
}
