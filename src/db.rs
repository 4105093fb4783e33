//! Database pool wiring and migration management.
//!
//! Migrations are validated and applied before the API starts serving
//! requests; startup aborts when the schema cannot be brought up to date.

use rocket_db_pools::{Database, sqlx};
use sqlx::PgPool;
use sqlx::migrate::Migrator;

#[derive(Database)]
#[database("crm_db")]
pub struct CrmDb(sqlx::PgPool);

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations.
///
/// Idempotent - migrations that have already been applied are skipped. Uses
/// SQLx's built-in migration tracking table.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    log::info!("checking database migration state");

    MIGRATOR.run(pool).await?;

    log::info!("database migrations up to date");
    Ok(())
}
