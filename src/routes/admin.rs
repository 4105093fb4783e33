//! Administrative maintenance endpoints.

use chrono::Utc;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::Serialize;

use crate::auth::{AuthState, RequireAdmin};
use crate::error::ApiError;

/// Response describing a session purge run.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PurgeSessionsResponse {
    /// Number of expired session rows removed.
    pub purged: u64,
}

/// Remove session rows that are already past expiry.
///
/// Expired sessions are invisible to verification either way; this merely
/// reclaims storage. There is no background sweeper.
#[openapi(tag = "Admin")]
#[post("/admin/sessions/purge")]
pub async fn purge_sessions(
    _admin: RequireAdmin,
    state: &State<AuthState>,
) -> Result<Json<PurgeSessionsResponse>, ApiError> {
    let purged = state.session_store.purge_expired(Utc::now()).await?;

    log::info!("purged {} expired sessions", purged);

    Ok(Json(PurgeSessionsResponse { purged }))
}
