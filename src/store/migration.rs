//! Schema migrations for the `trips` table.
//!
//! Migrations are applied before any row is imported; a database that cannot
//! be brought to the latest schema aborts the run.

use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations.
///
/// Idempotent: migrations that have already been applied are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
