//! Credential store: the only component that reads or writes user records.
//!
//! `User` deliberately does not implement `Serialize`; the stored credential
//! never crosses this boundary. Handlers work with the sanitized
//! [`crate::auth::responses::UserSummary`] projection instead.

use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::{self, FromRow, PgPool, Row};

use crate::auth::passwords::PasswordService;
use crate::auth::responses::{Role, UserSummary};
use crate::auth::{AuthConfig, AuthError, AuthResult};

/// Full user record, including the password credential. Internal to the
/// auth module.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_str(&self.role)
    }
}

/// Fields for creating a user. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

/// Fields for updating a user. A `None` password keeps the stored credential.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserStore {
    pool: PgPool,
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, password_hash, display_name, email, role, last_login_at, created_at
               FROM users
               WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: i32) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, password_hash, display_name, email, role, last_login_at, created_at
               FROM users
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Insert a new user, returning its id. A duplicate username fails with
    /// `Conflict`; uniqueness is backed by the database constraint.
    pub async fn insert(&self, user: &NewUser) -> AuthResult<i32> {
        let result = sqlx::query_scalar::<_, i32>(
            r#"INSERT INTO users (username, password_hash, display_name, email, role)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(id),
            Err(err) if is_unique_violation(&err) => Err(AuthError::Conflict(format!(
                "username '{}' already exists",
                user.username
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Update a user's fields. Fails with `NotFound` for an unknown id and
    /// `Conflict` when the new username collides with an existing account.
    pub async fn update(&self, id: i32, update: &UserUpdate) -> AuthResult<()> {
        let result = match &update.password_hash {
            Some(hash) => {
                sqlx::query(
                    r#"UPDATE users
                       SET username = $1, display_name = $2, email = $3, role = $4, password_hash = $5
                       WHERE id = $6"#,
                )
                .bind(&update.username)
                .bind(&update.display_name)
                .bind(&update.email)
                .bind(update.role.as_str())
                .bind(hash)
                .bind(id)
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"UPDATE users
                       SET username = $1, display_name = $2, email = $3, role = $4
                       WHERE id = $5"#,
                )
                .bind(&update.username)
                .bind(&update.display_name)
                .bind(&update.email)
                .bind(update.role.as_str())
                .bind(id)
                .execute(&self.pool)
                .await
            }
        };

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(AuthError::NotFound(format!("user {} not found", id)))
            }
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(AuthError::Conflict(format!(
                "username '{}' already exists",
                update.username
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a user and every session that references it. Deleting an
    /// unknown id is not an error.
    pub async fn delete(&self, id: i32) -> AuthResult<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All users, credential column excluded from the projection.
    pub async fn list_all(&self) -> AuthResult<Vec<UserSummary>> {
        let rows = sqlx::query(
            r#"SELECT id, username, display_name, email, role, last_login_at, created_at
               FROM users
               ORDER BY created_at ASC, id ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(UserSummary {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                name: row.try_get("display_name")?,
                email: row.try_get("email")?,
                role: Role::from_str(row.try_get::<String, _>("role")?.as_str()),
                last_login: row.try_get("last_login_at")?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(users)
    }

    /// Replace a user's stored credential.
    pub async fn set_password_hash(&self, id: i32, password_hash: &str) -> AuthResult<()> {
        let done = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(AuthError::NotFound(format!("user {} not found", id)));
        }

        Ok(())
    }

    /// Stamp a successful login. Callers treat a failure here as
    /// non-fatal; the login itself proceeds.
    pub async fn record_last_login(&self, id: i32, now: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Create the default administrator when no admin-role account exists.
    ///
    /// This is a recoverability mechanism against total lockout. The default
    /// credentials are well known, so a warning is logged telling operators
    /// to rotate them. Returns whether an account was created.
    pub async fn ensure_default_admin(
        &self,
        passwords: &PasswordService,
        config: &AuthConfig,
    ) -> AuthResult<bool> {
        let admin_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(&self.pool)
                .await?;

        if admin_exists {
            return Ok(false);
        }

        let password_hash = passwords.hash_password(&config.bootstrap_admin_password)?;
        let admin = NewUser {
            username: config.bootstrap_admin_username.clone(),
            password_hash,
            display_name: "Administrator".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
        };

        match self.insert(&admin).await {
            Ok(_) => {
                log::warn!(
                    "created default administrator '{}' with the well-known default password; rotate it immediately",
                    admin.username
                );
                Ok(true)
            }
            // Another instance won the bootstrap race; the account exists.
            Err(AuthError::Conflict(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}
