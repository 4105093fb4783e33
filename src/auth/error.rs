use rocket::http::Status;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username and wrong password collapse into this one variant so
    /// the response never reveals which of the two failed.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("no session")]
    NoSession,
    /// Unknown and expired session ids are indistinguishable to callers.
    #[error("invalid or expired session")]
    SessionInvalidOrExpired,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] rocket_db_pools::sqlx::Error),
    #[error("argon2 parameter error: {0}")]
    Argon2(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::InvalidCredentials
            | AuthError::NoSession
            | AuthError::SessionInvalidOrExpired
            | AuthError::Unauthorized => Status::Unauthorized,
            AuthError::Forbidden => Status::Forbidden,
            AuthError::Conflict(_) => Status::Conflict,
            AuthError::NotFound(_) => Status::NotFound,
            AuthError::Config(_)
            | AuthError::Sqlx(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_)
            | AuthError::Other(_) => Status::InternalServerError,
        }
    }

    /// Message safe to put in a client-facing response body. Server-side
    /// failure detail stays in the logs.
    pub fn client_message(&self) -> String {
        if self.status() == Status::InternalServerError {
            "Server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::Argon2(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_class_maps_to_401() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::NoSession,
            AuthError::SessionInvalidOrExpired,
            AuthError::Unauthorized,
        ] {
            assert_eq!(err.status(), Status::Unauthorized);
        }
    }

    #[test]
    fn server_side_failures_are_opaque_to_clients() {
        let err = AuthError::Config("missing variable".into());
        assert_eq!(err.status(), Status::InternalServerError);
        assert_eq!(err.client_message(), "Server error");

        let err = AuthError::Forbidden;
        assert_eq!(err.client_message(), "forbidden");
    }
}
