//! Database schema migrations
//!
//! Versioned, idempotent schema upgrades tracked in `schema_version`.
//! `init` creates tables at the current column set, so a fresh database is
//! only stamped with [`CURRENT_SCHEMA_VERSION`]. Upgrades for databases
//! stamped with an older version go here as `migrate_vN` steps.
//!
//! Never modify an existing migration. Add a new `migrate_vN` and bump
//! [`CURRENT_SCHEMA_VERSION`].

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = sqlx::query_scalar(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1"
    )
    .fetch_optional(pool)
    .await?;

    Ok(version.unwrap_or(0))
}

/// Set schema version in database
async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    if current_version == 0 {
        set_schema_version(pool, CURRENT_SCHEMA_VERSION).await?;
        info!("Stamped new database with schema v{}", CURRENT_SCHEMA_VERSION);
    }

    Ok(())
}
