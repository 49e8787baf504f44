//! Database initialization
//!
//! Creates the SQLite file on first run, applies connection pragmas and
//! creates every table idempotently before running versioned migrations.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Default busy timeout when none is configured
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    init_database_with_timeout(db_path, DEFAULT_BUSY_TIMEOUT_MS).await
}

/// Initialize database with an explicit SQLite busy timeout
pub async fn init_database_with_timeout(db_path: &Path, busy_timeout_ms: u64) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas set through connect options apply to every pooled connection
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema_version_table(&pool).await?;
    create_voters_table(&pool).await?;
    create_candidates_table(&pool).await?;
    create_votes_table(&pool).await?;
    create_tournament_sessions_table(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    info!("Database busy timeout set to {} ms", busy_timeout_ms);

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Shadow of the external identity relation
///
/// Rows are registered the first time a principal is seen so that votes
/// and sessions can reference them.
async fn create_voters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voters (
            id TEXT PRIMARY KEY,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
            first_seen_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_candidates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            id TEXT PRIMARY KEY,
            image_ref TEXT NOT NULL,
            vote_count INTEGER NOT NULL DEFAULT 0 CHECK (vote_count >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_candidates_image_ref ON candidates(image_ref)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_votes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS votes (
            id TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
            voter_id TEXT NOT NULL REFERENCES voters(id),
            cast_at TEXT NOT NULL,
            mode TEXT NOT NULL DEFAULT 'direct' CHECK (mode IN ('direct', 'tournament'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One direct vote per voter and candidate; tournament votes may repeat
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_votes_direct_unique
        ON votes(voter_id, candidate_id) WHERE mode = 'direct'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_votes_voter_cast_at ON votes(voter_id, cast_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_votes_cast_at ON votes(cast_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_tournament_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tournament_sessions (
            id TEXT PRIMARY KEY,
            voter_id TEXT NOT NULL REFERENCES voters(id) ON DELETE CASCADE,
            current_champion_id TEXT REFERENCES candidates(id) ON DELETE SET NULL,
            challenger_id TEXT REFERENCES candidates(id) ON DELETE SET NULL,
            round INTEGER NOT NULL DEFAULT 1 CHECK (round >= 1),
            is_active INTEGER NOT NULL DEFAULT 1,
            started_at TEXT NOT NULL,
            last_vote_at TEXT NOT NULL,
            ended_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one active session per voter
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_active
        ON tournament_sessions(voter_id) WHERE is_active = 1
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_voter_created ON tournament_sessions(voter_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
