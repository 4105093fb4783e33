//! Authentication module: configuration, credential handling, session
//! issuance and verification, Rocket request guards, and HTTP route handlers.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod passwords;
pub mod responses;
pub mod routes;
pub mod session_store;
pub mod user_store;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::{AuthUser, RequireAdmin};
pub use passwords::PasswordService;
pub use session_store::SessionStore;
pub use user_store::UserStore;

/// Everything the auth routes and guards need, held in Rocket managed state.
/// There is no process-wide singleton; handlers receive this explicitly.
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub password_service: Arc<PasswordService>,
    pub user_store: UserStore,
    pub session_store: SessionStore,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        password_service: PasswordService,
        user_store: UserStore,
        session_store: SessionStore,
    ) -> Self {
        Self {
            config,
            password_service: Arc::new(password_service),
            user_store,
            session_store,
        }
    }
}
