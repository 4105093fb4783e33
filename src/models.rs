//! Shared API data models.
//!
//! User records live behind the credential store boundary in
//! [`crate::auth::user_store`]; only sanitized projections
//! ([`crate::auth::responses::UserSummary`]) are serializable.

use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Generic wrapper used for list-style payloads.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

/// A customer order. Field names follow the wire format the web client
/// already speaks (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Order {
    pub id: String,
    pub marketplace: String,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "customerEmail")]
    pub customer_email: String,
    pub product: String,
    pub quantity: i32,
    pub price: f64,
    pub status: String,
    pub notes: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
