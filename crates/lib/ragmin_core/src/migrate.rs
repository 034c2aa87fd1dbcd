//! Database migration support.
//!
//! Embeds and runs SQL migrations from `ragmin_core/migrations/`.

use sqlx::MySqlPool;

/// Run all embedded database migrations against the given pool.
pub async fn migrate(pool: &MySqlPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
