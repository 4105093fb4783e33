//! Session store: opaque login tokens persisted in the `sessions` table.
//!
//! Tokens are 32 cryptographically random bytes, base64url-encoded, carrying
//! no decodable user information. Expiry is enforced purely by comparison at
//! read time; there is no background sweeper.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rocket_db_pools::sqlx::{self, PgPool, Row};

use crate::auth::AuthResult;
use crate::auth::guards::AuthUser;
use crate::auth::responses::Role;

const TOKEN_LEN: usize = 32;

/// A freshly issued session: the opaque token handed to the client and its
/// expiry.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Stored session fields, sans the token itself.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: i32,
    pub expires_at: DateTime<Utc>,
    pub remember_me: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: PgPool,
}

impl SessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a session for a verified user. `ttl` is chosen by the caller
    /// from the remember-me policy; sessions are never extended in place.
    pub async fn issue(
        &self,
        user_id: i32,
        remember_me: bool,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AuthResult<IssuedSession> {
        let token = generate_session_token();
        let expires_at = now + ttl;

        sqlx::query(
            r#"INSERT INTO sessions (id, user_id, expires_at, remember_me, created_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .bind(remember_me)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(IssuedSession { token, expires_at })
    }

    /// Resolve a token to its session and owning user in one query.
    ///
    /// Returns `None` for an unknown token and for an expired one alike;
    /// callers cannot tell the two apart.
    pub async fn find_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<(SessionRecord, AuthUser)>> {
        if token.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(
            r#"SELECT s.user_id, s.expires_at, s.remember_me, s.created_at AS session_created_at,
                      u.username, u.display_name, u.email, u.role, u.last_login_at, u.created_at
               FROM sessions s
               JOIN users u ON u.id = s.user_id
               WHERE s.id = $1 AND s.expires_at > $2"#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let session = SessionRecord {
            user_id: row.try_get("user_id")?,
            expires_at: row.try_get("expires_at")?,
            remember_me: row.try_get("remember_me")?,
            created_at: row.try_get("session_created_at")?,
        };

        let user = AuthUser {
            id: session.user_id,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            email: row.try_get("email")?,
            role: Role::from_str(row.try_get::<String, _>("role")?.as_str()),
            last_login_at: row.try_get("last_login_at")?,
            created_at: row.try_get("created_at")?,
        };

        Ok(Some((session, user)))
    }

    /// Delete a session. Unknown tokens are not an error.
    pub async fn delete(&self, token: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Drop every session owned by a user, e.g. when the account is removed.
    pub async fn delete_all_for_user(&self, user_id: i32) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Remove rows already past expiry. Purely housekeeping: expired rows are
    /// invisible to `find_valid` whether or not this ever runs.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Generate an unguessable opaque session token (256 bits of entropy).
fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_fixed_length_url_safe() {
        let token = generate_session_token();
        // 32 bytes -> 43 base64url characters, no padding.
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_session_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
