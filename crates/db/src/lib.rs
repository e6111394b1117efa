//! PostgreSQL persistence for LevelUp.
//!
//! - [`models`]: `FromRow` row structs, their conversions into domain types
//!   and the create/update DTOs.
//! - [`repositories`]: zero-sized repos with async queries over `&PgPool`.
//! - [`PgProgressionStore`]: the `ProgressionStore` implementation used by
//!   the progression engine.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod store;

pub use store::PgProgressionStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Cheap round trip used by startup and the `/health` route.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
