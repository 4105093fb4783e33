//! User-management endpoints.
//!
//! All of these mutate accounts, so the authorization gate runs at each
//! handler's entry point via the `RequireAdmin` guard; change-password
//! additionally admits the account owner.

use rocket::serde::json::Json;
use rocket::{State, delete, get, post, put};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::responses::{AckResponse, Role, UserSummary};
use crate::auth::user_store::{NewUser, UserUpdate};
use crate::auth::{AuthState, AuthUser, RequireAdmin};
use crate::error::ApiError;
use crate::models::DataResponse;

/// Request body for creating a user account.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Response returned when a user account is created.
#[derive(Debug, Serialize, JsonSchema)]
pub struct CreateUserResponse {
    pub success: bool,
    pub id: i32,
}

/// Request body for updating a user account. A missing password keeps the
/// stored credential.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateUserRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for the change-password operation.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChangePasswordRequest {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// List all user accounts. The credential column never appears in this
/// projection.
#[openapi(tag = "Users")]
#[get("/users")]
pub async fn list_users(
    _admin: RequireAdmin,
    state: &State<AuthState>,
) -> Result<Json<DataResponse<Vec<UserSummary>>>, ApiError> {
    let users = state.user_store.list_all().await?;

    Ok(Json(DataResponse { data: users }))
}

/// Create a user account. Fails with 409 when the username is taken.
#[openapi(tag = "Users")]
#[post("/users", data = "<payload>")]
pub async fn create_user(
    _admin: RequireAdmin,
    state: &State<AuthState>,
    payload: Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let password_hash = state.password_service.hash_password(&payload.password)?;
    let id = state
        .user_store
        .insert(&NewUser {
            username: username.to_string(),
            password_hash,
            display_name: payload.name.clone(),
            email: payload.email.clone(),
            role: payload.role,
        })
        .await?;

    log::info!("created user '{}' ({})", username, payload.role.as_str());

    Ok(Json(CreateUserResponse { success: true, id }))
}

/// Update a user account; optionally rotates the password. 404 for an
/// unknown id, 409 when the new username collides.
#[openapi(tag = "Users")]
#[put("/users/<id>", data = "<payload>")]
pub async fn update_user(
    _admin: RequireAdmin,
    state: &State<AuthState>,
    id: i32,
    payload: Json<UpdateUserRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }

    let password_hash = match payload.password.as_deref() {
        Some(password) if !password.is_empty() => {
            Some(state.password_service.hash_password(password)?)
        }
        _ => None,
    };

    state
        .user_store
        .update(
            id,
            &UserUpdate {
                username: username.to_string(),
                display_name: payload.name.clone(),
                email: payload.email.clone(),
                role: payload.role,
                password_hash,
            },
        )
        .await?;

    Ok(Json(AckResponse::ok()))
}

/// Remove a user account along with every session it owns. Idempotent:
/// deleting an unknown id succeeds.
#[openapi(tag = "Users")]
#[delete("/users/<id>")]
pub async fn delete_user(
    _admin: RequireAdmin,
    state: &State<AuthState>,
    id: i32,
) -> Result<Json<AckResponse>, ApiError> {
    state.user_store.delete(id).await?;

    Ok(Json(AckResponse::ok()))
}

/// Change a user's password after verifying the current one. Admitted for
/// administrators and for the account owner; everyone else gets 403.
#[openapi(tag = "Users")]
#[post("/users/<id>/change-password", data = "<payload>")]
pub async fn change_password(
    caller: AuthUser,
    state: &State<AuthState>,
    id: i32,
    payload: Json<ChangePasswordRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    if !(caller.is_admin() || caller.id == id) {
        return Err(ApiError::Forbidden("forbidden".to_string()));
    }

    if payload.new_password.is_empty() {
        return Err(ApiError::BadRequest(
            "New password is required".to_string(),
        ));
    }

    let user = state
        .user_store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", id)))?;

    if !state
        .password_service
        .verify_password(&payload.current_password, &user.password_hash)
    {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = state
        .password_service
        .hash_password(&payload.new_password)?;
    state.user_store.set_password_hash(id, &password_hash).await?;

    log::info!("password changed for user '{}'", user.username);

    Ok(Json(AckResponse::ok()))
}
