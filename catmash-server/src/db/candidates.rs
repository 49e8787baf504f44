//! Candidate store
//!
//! Soft-deleted rows (`deleted_at IS NOT NULL`) never take part in selection
//! or ranking but stay in the table so historical votes keep their target.
//! Insertion order is SQLite's implicit `rowid`, used to break ties.

use catmash_common::{time, Candidate, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqliteConnection};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::{get_opt_time, get_time, get_uuid};
use crate::random::RandomSource;

const COLUMNS: &str = "id, image_ref, vote_count, created_at, updated_at, deleted_at";

fn from_row(row: &SqliteRow) -> Result<Candidate> {
    Ok(Candidate {
        id: get_uuid(row, "id")?,
        image_ref: row.try_get("image_ref")?,
        vote_count: row.try_get("vote_count")?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
        deleted_at: get_opt_time(row, "deleted_at")?,
    })
}

/// Check that an image reference is an absolute http(s) URL
pub fn validate_image_ref(image_ref: &str) -> Result<()> {
    let url = reqwest::Url::parse(image_ref)
        .map_err(|e| Error::InvalidInput(format!("Invalid image URL '{}': {}", image_ref, e)))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        _ => Err(Error::InvalidInput(format!(
            "Image URL must be http(s) with a host: '{}'",
            image_ref
        ))),
    }
}

/// Insert a new candidate with a zero counter
///
/// No dedup happens here; callers wanting it query [`find_by_image_ref`] first.
pub async fn create<'e, E>(db: E, image_ref: &str) -> Result<Candidate>
where
    E: Executor<'e, Database = Sqlite>,
{
    validate_image_ref(image_ref)?;

    let now = time::now();
    let candidate = Candidate {
        id: Uuid::new_v4(),
        image_ref: image_ref.to_string(),
        vote_count: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO candidates (id, image_ref, vote_count, created_at, updated_at)
         VALUES (?, ?, 0, ?, ?)",
    )
    .bind(candidate.id.to_string())
    .bind(&candidate.image_ref)
    .bind(time::to_db(now))
    .bind(time::to_db(now))
    .execute(db)
    .await?;

    Ok(candidate)
}

/// Active candidate by id, `None` when missing or soft-deleted
pub async fn find_active<'e, E>(db: E, id: Uuid) -> Result<Option<Candidate>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM candidates WHERE id = ? AND deleted_at IS NULL",
        COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Active candidate by id, failing with `NotFound`
pub async fn find_active_by_id<'e, E>(db: E, id: Uuid) -> Result<Candidate>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_active(db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))
}

/// Candidate by id including soft-deleted rows
pub async fn find_by_id<'e, E>(db: E, id: Uuid) -> Result<Candidate>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM candidates WHERE id = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    match row {
        Some(row) => from_row(&row),
        None => Err(Error::NotFound(format!("Candidate {} not found", id))),
    }
}

/// Active candidate with the given image reference, if any
pub async fn find_by_image_ref<'e, E>(db: E, image_ref: &str) -> Result<Option<Candidate>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM candidates WHERE image_ref = ? AND deleted_at IS NULL ORDER BY rowid LIMIT 1",
        COLUMNS
    );
    let row = sqlx::query(&sql).bind(image_ref).fetch_optional(db).await?;

    row.as_ref().map(from_row).transpose()
}

/// Atomic `vote_count + 1` on an active candidate
pub async fn increment_vote<'e, E>(db: E, id: Uuid) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE candidates SET vote_count = vote_count + 1, updated_at = ?
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(time::to_db(time::now()))
    .bind(id.to_string())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Candidate {} not found", id)));
    }

    Ok(())
}

/// Soft-delete an active candidate
pub async fn soft_delete<'e, E>(db: E, id: Uuid) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = time::to_db(time::now());
    let result = sqlx::query(
        "UPDATE candidates SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&now)
    .bind(&now)
    .bind(id.to_string())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Candidate {} not found", id)));
    }

    Ok(())
}

/// Number of active candidates
pub async fn count<'e, E>(db: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE deleted_at IS NULL")
        .fetch_one(db)
        .await?;
    Ok(total)
}

/// Number of active candidates, failing with `EmptyPool` when zero
pub async fn count_non_empty<'e, E>(db: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    match count(db).await? {
        0 => Err(Error::EmptyPool),
        n => Ok(n),
    }
}

/// Active candidates in insertion order
pub async fn list_active<'e, E>(db: E) -> Result<Vec<Candidate>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM candidates WHERE deleted_at IS NULL ORDER BY rowid",
        COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(db).await?;
    rows.iter().map(from_row).collect()
}

/// Active candidates by `vote_count` descending, ties in insertion order
pub async fn ranked<'e, E>(db: E, limit: Option<i64>) -> Result<Vec<Candidate>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM candidates WHERE deleted_at IS NULL
         ORDER BY vote_count DESC, rowid ASC LIMIT ?",
        COLUMNS
    );
    // SQLite treats a negative LIMIT as unbounded
    let rows = sqlx::query(&sql)
        .bind(limit.unwrap_or(-1))
        .fetch_all(db)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Active candidates the voter has voted for, ranked by global `vote_count`
pub async fn top_voted_by<'e, E>(db: E, voter_id: Uuid, limit: i64) -> Result<Vec<Candidate>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM candidates
         WHERE deleted_at IS NULL
           AND id IN (SELECT DISTINCT candidate_id FROM votes WHERE voter_id = ?)
         ORDER BY vote_count DESC, rowid ASC LIMIT ?",
        COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(voter_id.to_string())
        .bind(limit)
        .fetch_all(db)
        .await?;
    rows.iter().map(from_row).collect()
}

async fn active_ids<'e, E>(db: E) -> Result<Vec<Uuid>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let raw: Vec<String> =
        sqlx::query_scalar("SELECT id FROM candidates WHERE deleted_at IS NULL ORDER BY rowid")
            .fetch_all(db)
            .await?;
    raw.iter().map(|s| catmash_common::uuid_utils::from_db(s)).collect()
}

/// Uniform random distinct pair of active candidates
pub async fn select_random_pair(
    conn: &mut SqliteConnection,
    random: &dyn RandomSource,
) -> Result<(Candidate, Candidate)> {
    let ids = active_ids(&mut *conn).await?;
    if ids.len() < 2 {
        return Err(Error::InsufficientCandidates {
            available: ids.len() as i64,
        });
    }

    let picked = random.distinct_indices(ids.len(), 2);
    let (first, second) = match picked.as_slice() {
        [a, b] => (ids[*a], ids[*b]),
        _ => return Err(Error::Internal("random source returned too few indices".to_string())),
    };
    debug!(pool = ids.len(), %first, %second, "Selected random pair");

    let first = find_active_by_id(&mut *conn, first).await?;
    let second = find_active_by_id(&mut *conn, second).await?;
    Ok((first, second))
}

/// Uniform random active candidate outside `exclude`, `None` if none qualifies
pub async fn select_random_excluding(
    conn: &mut SqliteConnection,
    random: &dyn RandomSource,
    exclude: &HashSet<Uuid>,
) -> Result<Option<Candidate>> {
    let eligible: Vec<Uuid> = active_ids(&mut *conn)
        .await?
        .into_iter()
        .filter(|id| !exclude.contains(id))
        .collect();

    match random.index(eligible.len()) {
        Some(i) => Ok(Some(find_active_by_id(&mut *conn, eligible[i]).await?)),
        None => Ok(None),
    }
}

/// Uniform random active candidate, `None` when the pool is empty
pub async fn select_random(
    conn: &mut SqliteConnection,
    random: &dyn RandomSource,
) -> Result<Option<Candidate>> {
    select_random_excluding(conn, random, &HashSet::new()).await
}
