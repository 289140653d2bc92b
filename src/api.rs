//! HTTP surface: thin axum handlers over the catalog, checkout, and
//! order services. User identity arrives as an opaque `X-User-Id`
//! header supplied by the authenticating proxy.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::{self, Product};
use crate::checkout::{self, LineRequest};
use crate::domain::events::{self, OrderEvent};
use crate::domain::status::OrderStatus;
use crate::error::{OrderError, Result};
use crate::orders::{self, ChargeOutcome, Order, OrderDetail, StatusHistory};
use crate::payments::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub nats: Option<async_nats::Client>,
    pub gateway: PaymentGateway,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route(
            "/api/v1/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/v1/orders", get(list_orders).post(place_order))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/history", get(order_history))
        .route("/api/v1/orders/:id/items", post(add_order_item))
        .route("/api/v1/orders/:id/items/:item_id", delete(remove_order_item))
        .route("/api/v1/orders/:id/status", post(set_status))
        .route("/api/v1/orders/:id/pay", post(pay_order))
        .route("/api/v1/orders/:id/payment", post(record_payment))
        .route("/api/v1/orders/:id/cancel", post(cancel_order))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "shoply"}))
}

fn request_user(headers: &HeaderMap) -> Result<Uuid> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or(OrderError::Unauthenticated)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

fn page_bounds(params: &ListParams) -> (u32, u32) {
    (params.page.unwrap_or(1).max(1), params.per_page.unwrap_or(10).clamp(1, 100))
}

// ---- products ----

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: Option<i32>,
}

async fn list_products(
    State(s): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>> {
    let (page, per_page) = page_bounds(&params);
    let (data, total) = catalog::list(&s.db, page, per_page).await?;
    Ok(Json(PaginatedResponse { data, total, page }))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    catalog::get(&s.db, id).await.map(Json)
}

async fn create_product(
    State(s): State<AppState>,
    Json(r): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    r.validate()?;
    let product =
        catalog::create(&s.db, &r.name, r.description.as_deref(), r.price, r.stock.unwrap_or(0))
            .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<ProductRequest>,
) -> Result<Json<Product>> {
    r.validate()?;
    let product =
        catalog::update(&s.db, id, &r.name, r.description.as_deref(), r.price, r.stock.unwrap_or(0))
            .await?;
    Ok(Json(product))
}

async fn delete_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    catalog::delete(&s.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- orders ----

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    pub items: Vec<LineRequest>,
}

async fn place_order(
    State(s): State<AppState>,
    headers: HeaderMap,
    Json(r): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    let user_id = request_user(&headers)?;
    r.validate()?;
    let detail = checkout::place_order(&s.db, user_id, &r.items).await?;
    events::publish(
        &s.nats,
        &OrderEvent::OrderPlaced {
            order_id: detail.order.id,
            user_id,
            total: detail.order.total_price,
        },
    )
    .await;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn list_orders(
    State(s): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Order>>> {
    let user_id = request_user(&headers)?;
    let (page, per_page) = page_bounds(&params);
    let (data, total) = orders::list(&s.db, user_id, page, per_page).await?;
    Ok(Json(PaginatedResponse { data, total, page }))
}

async fn get_order(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>> {
    let user_id = request_user(&headers)?;
    orders::get(&s.db, id, user_id).await.map(Json)
}

async fn order_history(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusHistory>>> {
    let user_id = request_user(&headers)?;
    orders::history(&s.db, id, user_id).await.map(Json)
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Option<Decimal>,
}

/// Administrative line-item correction; reserves stock and recomputes
/// the order total.
async fn add_order_item(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<AddItemRequest>,
) -> Result<Json<OrderDetail>> {
    orders::add_item(&s.db, id, r.product_id, r.quantity, r.price).await.map(Json)
}

async fn remove_order_item(
    State(s): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OrderDetail>> {
    orders::remove_item(&s.db, id, item_id).await.map(Json)
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

async fn set_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<SetStatusRequest>,
) -> Result<Json<Order>> {
    let change = orders::set_status(&s.db, id, r.status).await?;
    events::publish(
        &s.nats,
        &OrderEvent::StatusChanged {
            order_id: id,
            previous: change.previous,
            new: change.order.status,
        },
    )
    .await;
    Ok(Json(change.order))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PayRequest {
    #[validate(length(min = 1))]
    pub token: String,
}

/// Charges the order total through the gateway and records the outcome.
async fn pay_order(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(r): Json<PayRequest>,
) -> Result<Json<Order>> {
    let user_id = request_user(&headers)?;
    r.validate()?;
    let detail = orders::get(&s.db, id, user_id).await?;
    if detail.order.is_paid {
        return Err(OrderError::PaymentRecordingConflict);
    }
    let charge_id = s.gateway.charge(id, detail.order.total_price, &r.token)?;
    let order = orders::record_payment(&s.db, id, &charge_id, ChargeOutcome::Success).await?;
    events::publish(
        &s.nats,
        &OrderEvent::PaymentRecorded { order_id: id, charge_id, outcome: ChargeOutcome::Success },
    )
    .await;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct PaymentReport {
    pub charge_id: String,
    pub outcome: ChargeOutcome,
}

/// Records an externally reported charge outcome (webhook style).
async fn record_payment(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<PaymentReport>,
) -> Result<Json<Order>> {
    let order = orders::record_payment(&s.db, id, &r.charge_id, r.outcome).await?;
    events::publish(
        &s.nats,
        &OrderEvent::PaymentRecorded { order_id: id, charge_id: r.charge_id, outcome: r.outcome },
    )
    .await;
    Ok(Json(order))
}

async fn cancel_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    let change = orders::cancel(&s.db, id).await?;
    events::publish(
        &s.nats,
        &OrderEvent::OrderCancelled { order_id: id, refunded: change.order.is_refunded },
    )
    .await;
    Ok(Json(change.order))
}
