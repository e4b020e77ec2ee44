//! Embedded schema migrations for the grant store.
//!
//! Migrations are embedded in the binary at compile time with
//! `include_str!()`, tracked in the configured migration table, and applied
//! in version order inside one transaction each. The runner is idempotent
//! and safe to call on every process start; concurrent starts serialize on a
//! transaction-scoped advisory lock.
//!
//! The `{{prefix}}` placeholder in migration SQL is substituted with the
//! configured table prefix before execution. Both the prefix and the
//! tracking table name are configuration-time strings, never user input.
//!
//! To add a new migration:
//! 1. Create the SQL file in the migrations/ directory
//! 2. Add an entry to the `embedded_migrations!()` macro below

use sqlx_core::executor::Executor;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tracing::info;

use grantstore_core::{StoreError, StoreResult};

use crate::PgPool;
use crate::config::StoreConfig;

/// Advisory lock key guarding concurrent migration runs.
const MIGRATION_LOCK_KEY: i64 = 0x6772_616e_745f_7374;

/// Embedded migrations in chronological order: (version, description, sql).
macro_rules! embedded_migrations {
    () => {
        &[(
            1i64,
            "create_request",
            include_str!("../migrations/0001_create_request.sql"),
        )]
    };
}

/// Apply all pending migrations.
///
/// Creates the tracking table if missing, then applies each embedded
/// migration not yet recorded there. Call before first store use; the store
/// is unusable if this fails, so callers should treat an error as fatal at
/// startup.
///
/// # Errors
///
/// Returns a [`StoreError::Backend`] if the tracking table cannot be
/// created or a migration fails to execute.
pub async fn run(pool: &PgPool, config: &StoreConfig) -> StoreResult<()> {
    info!(table = %config.migration_table, "applying grant store migrations");

    let create_tracking = format!(
        "CREATE TABLE IF NOT EXISTS {} (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
        config.migration_table
    );
    query(&create_tracking)
        .execute(pool)
        .await
        .map_err(StoreError::backend)?;

    let migrations: &[(i64, &str, &str)] = embedded_migrations!();
    for (version, description, sql) in migrations {
        apply(pool, config, *version, description, sql).await?;
    }

    info!("grant store migrations up to date");
    Ok(())
}

/// Apply one migration in its own transaction, skipping it if already
/// recorded in the tracking table.
async fn apply(
    pool: &PgPool,
    config: &StoreConfig,
    version: i64,
    description: &str,
    sql: &str,
) -> StoreResult<()> {
    let mut tx = pool.begin().await.map_err(StoreError::backend)?;

    // Serialize concurrent process starts on the same database.
    query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

    let select = format!(
        "SELECT version FROM {} WHERE version = $1",
        config.migration_table
    );
    let applied: Option<(i64,)> = query_as(&select)
        .bind(version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::backend)?;
    if applied.is_some() {
        return Ok(());
    }

    let sql = sql.replace("{{prefix}}", &config.tables_prefix);
    (&mut *tx)
        .execute(sql.as_str())
        .await
        .map_err(StoreError::backend)?;

    let record = format!(
        "INSERT INTO {} (version, description) VALUES ($1, $2)",
        config.migration_table
    );
    query(&record)
        .bind(version)
        .bind(description)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

    tx.commit().await.map_err(StoreError::backend)?;
    info!(version, description, "applied migration");
    Ok(())
}
