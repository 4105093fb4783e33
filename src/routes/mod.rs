//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule corresponds to a logical area of the API (orders, users,
//! maintenance) and exposes typed Rocket handlers annotated with
//! `#[openapi]` so `rocket_okapi` can derive an OpenAPI document
//! automatically. Auth handlers live in `crate::auth::routes`.

pub mod admin;
pub mod health;
pub mod orders;
pub mod users;
