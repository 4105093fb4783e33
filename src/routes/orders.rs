//! Customer order CRUD and bulk import.
//!
//! Orders are plain data rows; any authenticated user may manage them. The
//! bulk endpoint exists for spreadsheet imports and runs in one transaction.

use chrono::{DateTime, Utc};
use rocket::serde::json::Json;
use rocket::{State, delete, get, post, put};
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use std::ops::DerefMut;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{DataResponse, Order};

/// Request body for creating or importing an order. The id and creation
/// timestamp are optional; imports supply their own, fresh orders get
/// generated ones.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct OrderPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub marketplace: String,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "customerEmail")]
    pub customer_email: String,
    pub product: String,
    pub quantity: i32,
    pub price: f64,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for the bulk import endpoint.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BulkImportRequest {
    pub orders: Vec<OrderPayload>,
}

/// Response returned after a bulk import.
#[derive(Debug, Serialize, JsonSchema)]
pub struct BulkImportResponse {
    pub success: bool,
    pub count: usize,
}

/// Simple `{"success": true}` acknowledgement for order mutations.
#[derive(Debug, Serialize, JsonSchema)]
pub struct OrderAck {
    pub success: bool,
}

/// List all orders, newest first.
#[openapi(tag = "Orders")]
#[get("/orders")]
pub async fn list_orders(
    _user: AuthUser,
    pool: &State<PgPool>,
) -> Result<Json<DataResponse<Vec<Order>>>, ApiError> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"SELECT id, marketplace, customer_name, customer_email, product,
                  quantity, price, status, notes, created_at
           FROM orders
           ORDER BY created_at DESC"#,
    )
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(DataResponse { data: orders }))
}

/// Create a single order.
#[openapi(tag = "Orders")]
#[post("/orders", data = "<payload>")]
pub async fn create_order(
    _user: AuthUser,
    pool: &State<PgPool>,
    payload: Json<OrderPayload>,
) -> Result<Json<OrderAck>, ApiError> {
    let order = payload.into_inner();
    let id = order
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    insert_order(pool.inner(), &id, &order, Utc::now()).await?;

    Ok(Json(OrderAck { success: true }))
}

/// Update an order. 404 for an unknown id.
#[openapi(tag = "Orders")]
#[put("/orders/<id>", data = "<payload>")]
pub async fn update_order(
    _user: AuthUser,
    pool: &State<PgPool>,
    id: String,
    payload: Json<OrderPayload>,
) -> Result<Json<OrderAck>, ApiError> {
    let done = sqlx::query(
        r#"UPDATE orders
           SET marketplace = $1, customer_name = $2, customer_email = $3, product = $4,
               quantity = $5, price = $6, status = $7, notes = $8
           WHERE id = $9"#,
    )
    .bind(&payload.marketplace)
    .bind(&payload.customer_name)
    .bind(&payload.customer_email)
    .bind(&payload.product)
    .bind(payload.quantity)
    .bind(payload.price)
    .bind(&payload.status)
    .bind(payload.notes.as_deref().unwrap_or(""))
    .bind(&id)
    .execute(pool.inner())
    .await?;

    if done.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Order '{}' not found", id)));
    }

    Ok(Json(OrderAck { success: true }))
}

/// Delete an order. Idempotent: an unknown id is not an error.
#[openapi(tag = "Orders")]
#[delete("/orders/<id>")]
pub async fn delete_order(
    _user: AuthUser,
    pool: &State<PgPool>,
    id: String,
) -> Result<Json<OrderAck>, ApiError> {
    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(&id)
        .execute(pool.inner())
        .await?;

    Ok(Json(OrderAck { success: true }))
}

/// Delete every order.
#[openapi(tag = "Orders")]
#[delete("/orders")]
pub async fn clear_orders(
    _user: AuthUser,
    pool: &State<PgPool>,
) -> Result<Json<OrderAck>, ApiError> {
    sqlx::query("DELETE FROM orders").execute(pool.inner()).await?;

    Ok(Json(OrderAck { success: true }))
}

/// Import a batch of orders in a single transaction; either every row lands
/// or none do.
#[openapi(tag = "Orders")]
#[post("/orders/bulk", data = "<payload>")]
pub async fn bulk_import_orders(
    _user: AuthUser,
    pool: &State<PgPool>,
    payload: Json<BulkImportRequest>,
) -> Result<Json<BulkImportResponse>, ApiError> {
    let request = payload.into_inner();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    for order in &request.orders {
        let id = order
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        sqlx::query(
            r#"INSERT INTO orders (id, marketplace, customer_name, customer_email, product,
                                   quantity, price, status, notes, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(&id)
        .bind(&order.marketplace)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.product)
        .bind(order.quantity)
        .bind(order.price)
        .bind(&order.status)
        .bind(order.notes.as_deref().unwrap_or(""))
        .bind(order.created_at.unwrap_or(now))
        .execute(tx.deref_mut())
        .await?;
    }

    tx.commit().await?;

    log::info!("bulk imported {} orders", request.orders.len());

    Ok(Json(BulkImportResponse {
        success: true,
        count: request.orders.len(),
    }))
}

async fn insert_order(
    pool: &PgPool,
    id: &str,
    order: &OrderPayload,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"INSERT INTO orders (id, marketplace, customer_name, customer_email, product,
                               quantity, price, status, notes, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
    )
    .bind(id)
    .bind(&order.marketplace)
    .bind(&order.customer_name)
    .bind(&order.customer_email)
    .bind(&order.product)
    .bind(order.quantity)
    .bind(order.price)
    .bind(&order.status)
    .bind(order.notes.as_deref().unwrap_or(""))
    .bind(order.created_at.unwrap_or(now))
    .execute(pool)
    .await?;

    Ok(())
}
