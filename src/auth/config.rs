use chrono::Duration;

/// Authentication configuration loaded from environment variables.
///
/// Exactly two session lifetimes are recognized: the short default and the
/// long "remember me" variant selected at login time.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl_secs: i64,
    pub remember_session_ttl_secs: i64,
    pub bootstrap_admin_username: String,
    pub bootstrap_admin_password: String,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let session_ttl_secs = std::env::var("CRM_SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60 * 60);
        let remember_session_ttl_secs = std::env::var("CRM_REMEMBER_SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(30 * 24 * 60 * 60);
        let bootstrap_admin_username =
            std::env::var("CRM_BOOTSTRAP_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
        let bootstrap_admin_password =
            std::env::var("CRM_BOOTSTRAP_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into());

        Self {
            session_ttl_secs,
            remember_session_ttl_secs,
            bootstrap_admin_username,
            bootstrap_admin_password,
        }
    }

    /// Session lifetime for a login, picked by the remember-me flag.
    pub fn session_ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            Duration::seconds(self.remember_session_ttl_secs)
        } else {
            Duration::seconds(self.session_ttl_secs)
        }
    }
}
