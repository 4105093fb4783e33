#[macro_use]
extern crate rocket;

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;

use crate::auth::{AuthConfig, AuthState, PasswordService, SessionStore, UserStore};
use crate::db::CrmDb;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    log::info!("Starting Order CRM API Server");

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(CrmDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite("Run Migrations", |rocket| async move {
            match CrmDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    match db::run_migrations(&pool).await {
                        Ok(_) => {
                            log::info!("database migrations successful");
                            Ok(rocket)
                        }
                        Err(e) => {
                            log::error!("database migrations failed: {}", e);
                            Err(rocket)
                        }
                    }
                }
                None => {
                    log::error!("database pool not available for migrations");
                    Err(rocket)
                }
            }
        }))
        // Clone the pool into managed state and build the auth context all
        // handlers receive; no process-wide singleton.
        .attach(AdHoc::try_on_ignite(
            "Manage DB Pool and Auth State",
            |rocket| async move {
                match CrmDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();

                        let config = AuthConfig::from_env();
                        let password_service = match PasswordService::new() {
                            Ok(service) => service,
                            Err(e) => {
                                log::error!("failed to initialize password hashing: {}", e);
                                return Err(rocket);
                            }
                        };

                        let auth_state = AuthState::new(
                            config,
                            password_service,
                            UserStore::new(pool.clone()),
                            SessionStore::new(pool.clone()),
                        );

                        Ok(rocket.manage(pool).manage(auth_state))
                    }
                    None => Err(rocket),
                }
            },
        ))
        // Guarantee an administrator account exists so a fresh deployment
        // is never locked out.
        .attach(AdHoc::try_on_ignite(
            "Bootstrap Default Admin",
            |rocket| async move {
                let auth_state = match rocket.state::<AuthState>() {
                    Some(state) => state.clone(),
                    None => {
                        log::error!("auth state not available for admin bootstrap");
                        return Err(rocket);
                    }
                };

                match auth_state
                    .user_store
                    .ensure_default_admin(&auth_state.password_service, &auth_state.config)
                    .await
                {
                    Ok(_) => Ok(rocket),
                    Err(e) => {
                        log::error!("default admin bootstrap failed: {}", e);
                        Err(rocket)
                    }
                }
            },
        ))
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Auth routes
                auth::routes::login,
                auth::routes::verify,
                auth::routes::logout,
                // User management routes
                routes::users::list_users,
                routes::users::create_user,
                routes::users::update_user,
                routes::users::delete_user,
                routes::users::change_password,
                // Order routes
                routes::orders::list_orders,
                routes::orders::create_order,
                routes::orders::update_order,
                routes::orders::delete_order,
                routes::orders::clear_orders,
                routes::orders::bulk_import_orders,
                // Admin routes
                routes::admin::purge_sessions,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Order CRM API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::{self, PgPool};

    use crate::auth::{AuthConfig, AuthState, PasswordService, SessionStore, UserStore};

    pub use database::{TestDatabase, TestDatabaseError};

    /// Auth context with test defaults, bound to the provided pool.
    pub fn test_auth_state(pool: &PgPool) -> AuthState {
        let config = AuthConfig {
            session_ttl_secs: 3600,
            remember_session_ttl_secs: 30 * 24 * 60 * 60,
            bootstrap_admin_username: "admin".into(),
            bootstrap_admin_password: "admin123".into(),
        };
        let password_service = PasswordService::new().expect("password service");
        AuthState::new(
            config,
            password_service,
            UserStore::new(pool.clone()),
            SessionStore::new(pool.clone()),
        )
    }

    /// Convenience helpers for seeding auth- and order-related tables in
    /// tests.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        /// Create a fixture helper bound to the provided pool.
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a user row, returning the new user id.
        pub async fn insert_user(
            &self,
            username: &str,
            display_name: &str,
            email: &str,
            role: &str,
            password_hash: &str,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO users (username, password_hash, display_name, email, role) VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(username)
            .bind(password_hash)
            .bind(display_name)
            .bind(email)
            .bind(role)
            .fetch_one(self.pool)
            .await
        }

        /// Insert a session row directly, bypassing the issuing path. Useful
        /// for seeding already-expired sessions.
        pub async fn insert_session(
            &self,
            token: &str,
            user_id: i32,
            expires_at: chrono::DateTime<chrono::Utc>,
            remember_me: bool,
        ) -> Result<(), sqlx::Error> {
            sqlx::query(
                "INSERT INTO sessions (id, user_id, expires_at, remember_me) VALUES ($1, $2, $3, $4)",
            )
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .bind(remember_me)
            .execute(self.pool)
            .await?;

            Ok(())
        }

        /// Insert an order row for assertions in tests.
        pub async fn insert_order(
            &self,
            id: &str,
            marketplace: &str,
            customer_name: &str,
            product: &str,
        ) -> Result<(), sqlx::Error> {
            sqlx::query(
                "INSERT INTO orders (id, marketplace, customer_name, customer_email, product, quantity, price, status) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(id)
            .bind(marketplace)
            .bind(customer_name)
            .bind(format!("{}@example.com", customer_name))
            .bind(product)
            .bind(1)
            .bind(9.99f64)
            .bind("pending")
            .execute(self.pool)
            .await?;

            Ok(())
        }
    }

    pub mod database {
        use rocket_db_pools::sqlx::postgres::PgPoolOptions;
        use rocket_db_pools::sqlx::{self, PgPool};
        use testcontainers::{GenericImage, ImageExt, core::WaitFor};
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests: launches a
        /// disposable Postgres container and applies migrations.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            container: Option<ContainerAsync<GenericImage>>,
        }

        impl TestDatabase {
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let image = GenericImage::new("postgres", "16-alpine")
                    .with_wait_for(WaitFor::message_on_stdout(
                        "database system is ready to accept connections",
                    ))
                    .with_wait_for(WaitFor::message_on_stderr(
                        "database system is ready to accept connections",
                    ));

                let request = image
                    .with_env_var("POSTGRES_DB", "postgres")
                    .with_env_var("POSTGRES_USER", "postgres")
                    .with_env_var("POSTGRES_PASSWORD", "postgres");

                let container = request.start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&url)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                crate::db::run_migrations(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    container: Some(container),
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Convenience method returning a clone of the pooled connection
            /// handle.
            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and discard the container.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration
    /// tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        auth_state: Option<AuthState>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging
        /// disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
                auth_state: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Manage a `PgPool` instance for tests that exercise
        /// database-backed routes.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        /// Manage an `AuthState` for tests that exercise auth-backed routes.
        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }

            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
