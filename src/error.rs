use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use serde::Serialize;
use std::io::Cursor;

use crate::auth::AuthError;

#[derive(Debug)]
pub enum ApiError {
    DatabaseError(sqlx::Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        // Store failures are logged with full detail but reported to the
        // client as an opaque 500 body.
        let (status, message) = match self {
            ApiError::DatabaseError(e) => {
                log::error!("database error: {}", e);
                (Status::InternalServerError, "Server error".to_string())
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, msg)
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, msg)
            }
            ApiError::Conflict(msg) => {
                log::debug!("conflict: {}", msg);
                (Status::Conflict, msg)
            }
            ApiError::Unauthorized(msg) => {
                log::debug!("unauthorized: {}", msg);
                (Status::Unauthorized, msg)
            }
            ApiError::Forbidden(msg) => {
                log::debug!("forbidden: {}", msg);
                (Status::Forbidden, msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (Status::InternalServerError, "Server error".to_string())
            }
        };

        let error_response = ErrorResponse { error: message };

        let json = serde_json::to_string(&error_response)
            .unwrap_or_else(|_| r#"{"error":"Server error"}"#.to_string());

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl rocket_okapi::response::OpenApiResponderInner for ApiError {
    fn responses(
        _gen: &mut rocket_okapi::r#gen::OpenApiGenerator,
    ) -> rocket_okapi::Result<rocket_okapi::okapi::openapi3::Responses> {
        let mut responses = rocket_okapi::okapi::openapi3::Responses::default();
        for status in [400u16, 401, 403, 404, 409, 500] {
            rocket_okapi::util::ensure_status_code_exists(&mut responses, status);
        }
        Ok(responses)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                ApiError::Conflict("A record with this identifier already exists".to_string())
            }
            _ => ApiError::DatabaseError(err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotFound(msg) => ApiError::NotFound(msg),
            AuthError::Conflict(msg) => ApiError::Conflict(msg),
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::Forbidden => ApiError::Forbidden(err.to_string()),
            AuthError::NoSession
            | AuthError::SessionInvalidOrExpired
            | AuthError::Unauthorized => ApiError::Unauthorized(err.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}
