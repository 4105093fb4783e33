use chrono::{DateTime, Utc};
use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::request::OpenApiFromRequest;

use crate::auth::responses::Role;
use crate::auth::{AuthError, AuthResult, AuthState};

/// The user resolved from the opaque session token on a request. This is the
/// sanitized projection; the credential never reaches request handlers.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session_user(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

/// Authorization gate: admits only admin-role users, failing with 403 for
/// everyone else. Privileged handlers take this guard so the check runs at
/// the operation's entry point, not in a client UI.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct RequireAdmin(pub AuthUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireAdmin {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => {
                if user.is_admin() {
                    Outcome::Success(RequireAdmin(user))
                } else {
                    Outcome::Error((Status::Forbidden, AuthError::Forbidden))
                }
            }
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => Outcome::Error((Status::Unauthorized, AuthError::Unauthorized)),
        }
    }
}

async fn resolve_session_user(request: &Request<'_>) -> AuthResult<AuthUser> {
    let token = bearer_token_from_request(request)?;

    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let resolved = auth_state
        .session_store
        .find_valid(token, Utc::now())
        .await?;

    match resolved {
        Some((_, user)) => Ok(user),
        None => Err(AuthError::SessionInvalidOrExpired),
    }
}

fn bearer_token_from_request<'r>(request: &'r Request<'_>) -> AuthResult<&'r str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::NoSession)?;
    parse_bearer(header)
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
fn parse_bearer(header: &str) -> AuthResult<&str> {
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token)
    } else {
        Err(AuthError::NoSession)
    }
}
