//! Login, verify, and logout: the façade the HTTP layer consumes.
//!
//! Credential and session lookup failures never propagate past these
//! handlers as raw errors; they resolve to generic 401 responses, and
//! unexpected store failures surface as opaque 500s.

use chrono::Utc;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;

use crate::auth::responses::{
    AckResponse, LoginRequest, LoginResponse, LogoutRequest, UserSummary, VerifyRequest,
    VerifyResponse,
};
use crate::auth::{AuthError, AuthState};

type AuthRouteResult<T> = Result<Json<T>, status::Custom<Json<AuthErrorResponse>>>;

#[derive(Debug, serde::Serialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub error: String,
}

/// Authenticate a username/password pair and issue a fresh session.
///
/// An unknown username and a wrong password produce the identical 401
/// response so the endpoint cannot be used to enumerate accounts.
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<LoginResponse> {
    let username = payload.username.trim();
    let password = payload.password.trim();

    if username.is_empty() || password.is_empty() {
        return Err(respond_message(
            Status::BadRequest,
            "Username and password are required",
        ));
    }

    let user = state
        .user_store
        .find_by_username(username)
        .await
        .map_err(respond_error)?;

    let user = match user {
        Some(user) => user,
        None => return Err(invalid_credentials()),
    };

    if !state
        .password_service
        .verify_password(password, &user.password_hash)
    {
        return Err(invalid_credentials());
    }

    let now = Utc::now();

    // Best effort: a failed last-login stamp must not abort the login.
    if let Err(err) = state.user_store.record_last_login(user.id, now).await {
        log::warn!("failed to record last login for user {}: {}", user.id, err);
    }

    let session = state
        .session_store
        .issue(
            user.id,
            payload.remember_me,
            now,
            state.config.session_ttl(payload.remember_me),
        )
        .await
        .map_err(respond_error)?;

    log::info!("user '{}' logged in", user.username);

    Ok(Json(LoginResponse {
        success: true,
        user: UserSummary::from(&user),
        session_id: session.token,
        expires_at: session.expires_at,
    }))
}

/// Resolve a session id to its owning user.
///
/// A missing id short-circuits without a store lookup; unknown and expired
/// ids produce the identical 401 response.
#[openapi(tag = "Auth")]
#[post("/auth/verify", data = "<payload>")]
pub async fn verify(
    state: &State<AuthState>,
    payload: Json<VerifyRequest>,
) -> AuthRouteResult<VerifyResponse> {
    let session_id = match payload.session_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => return Err(respond_error(AuthError::NoSession)),
    };

    let resolved = state
        .session_store
        .find_valid(session_id, Utc::now())
        .await
        .map_err(respond_error)?;

    match resolved {
        Some((_, user)) => Ok(Json(VerifyResponse {
            success: true,
            user: UserSummary::from(&user),
        })),
        None => Err(respond_error(AuthError::SessionInvalidOrExpired)),
    }
}

/// Delete a session. Idempotent sign-out: unknown and already-expired ids
/// succeed exactly like live ones.
#[openapi(tag = "Auth")]
#[post("/auth/logout", data = "<payload>")]
pub async fn logout(
    state: &State<AuthState>,
    payload: Json<LogoutRequest>,
) -> AuthRouteResult<AckResponse> {
    if let Some(session_id) = payload.session_id.as_deref() {
        if !session_id.is_empty() {
            state
                .session_store
                .delete(session_id)
                .await
                .map_err(respond_error)?;
        }
    }

    Ok(Json(AckResponse::ok()))
}

fn respond_error(err: AuthError) -> status::Custom<Json<AuthErrorResponse>> {
    let status = err.status();
    if status == Status::InternalServerError {
        log::error!("auth route error: {}", err);
    }
    status::Custom(
        status,
        Json(AuthErrorResponse {
            error: err.client_message(),
        }),
    )
}

fn respond_message(
    status: Status,
    message: impl Into<String>,
) -> status::Custom<Json<AuthErrorResponse>> {
    status::Custom(
        status,
        Json(AuthErrorResponse {
            error: message.into(),
        }),
    )
}

fn invalid_credentials() -> status::Custom<Json<AuthErrorResponse>> {
    respond_error(AuthError::InvalidCredentials)
}
