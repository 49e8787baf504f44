//! Repositories over the shared SQLite database
//!
//! Single-statement functions are generic over [`sqlx::Executor`] so they run
//! against the pool or inside a caller's transaction (`&mut *tx`).
//! Multi-statement operations take `&mut SqliteConnection` and rely on the
//! caller to supply a transaction.

pub mod candidates;
pub mod sessions;
pub mod voters;
pub mod votes;

use catmash_common::{time, uuid_utils, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    uuid_utils::from_db(&raw)
}

fn get_opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.as_deref().map(uuid_utils::from_db).transpose()
}

fn get_time(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    time::from_db(&raw)
}

fn get_opt_time(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.as_deref().map(time::from_db).transpose()
}
