//! Tournament session persistence
//!
//! Every mutation bumps `version`; [`save`] only writes when the stored
//! version still matches the one the caller loaded.

use catmash_common::{time, Error, Result, TournamentSession};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use super::{get_opt_time, get_opt_uuid, get_time, get_uuid};

const COLUMNS: &str = "id, voter_id, current_champion_id, challenger_id, round, is_active, \
                       started_at, last_vote_at, ended_at, created_at, updated_at, version";

fn from_row(row: &SqliteRow) -> Result<TournamentSession> {
    let is_active: i64 = row.try_get("is_active")?;
    Ok(TournamentSession {
        id: get_uuid(row, "id")?,
        voter_id: get_uuid(row, "voter_id")?,
        current_champion_id: get_opt_uuid(row, "current_champion_id")?,
        challenger_id: get_opt_uuid(row, "challenger_id")?,
        round: row.try_get("round")?,
        is_active: is_active != 0,
        started_at: get_time(row, "started_at")?,
        last_vote_at: get_time(row, "last_vote_at")?,
        ended_at: get_opt_time(row, "ended_at")?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
        version: row.try_get("version")?,
    })
}

/// Build a fresh round-1 session for a voter
pub fn new_session(
    voter_id: Uuid,
    champion_id: Uuid,
    challenger_id: Uuid,
    now: DateTime<Utc>,
) -> TournamentSession {
    TournamentSession {
        id: Uuid::new_v4(),
        voter_id,
        current_champion_id: Some(champion_id),
        challenger_id: Some(challenger_id),
        round: 1,
        is_active: true,
        started_at: now,
        last_vote_at: now,
        ended_at: None,
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

/// The voter's active session, if any
pub async fn find_active<'e, E>(db: E, voter_id: Uuid) -> Result<Option<TournamentSession>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM tournament_sessions WHERE voter_id = ? AND is_active = 1",
        COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(voter_id.to_string())
        .fetch_optional(db)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Deactivate whatever session the voter has open; returns rows touched
pub async fn deactivate_active<'e, E>(db: E, voter_id: Uuid, now: DateTime<Utc>) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = time::to_db(now);
    let result = sqlx::query(
        "UPDATE tournament_sessions
         SET is_active = 0, ended_at = ?, updated_at = ?, version = version + 1
         WHERE voter_id = ? AND is_active = 1",
    )
    .bind(&now)
    .bind(&now)
    .bind(voter_id.to_string())
    .execute(db)
    .await?;

    if result.rows_affected() > 0 {
        debug!(%voter_id, "Deactivated previous session");
    }
    Ok(result.rows_affected())
}

/// Insert a new session
///
/// A second active session for the same voter trips the partial unique index
/// and surfaces as `ConcurrencyConflict`.
pub async fn insert<'e, E>(db: E, session: &TournamentSession) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO tournament_sessions
            (id, voter_id, current_champion_id, challenger_id, round, is_active,
             started_at, last_vote_at, ended_at, created_at, updated_at, version)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.id.to_string())
    .bind(session.voter_id.to_string())
    .bind(session.current_champion_id.map(|id| id.to_string()))
    .bind(session.challenger_id.map(|id| id.to_string()))
    .bind(session.round)
    .bind(session.is_active as i64)
    .bind(time::to_db(session.started_at))
    .bind(time::to_db(session.last_vote_at))
    .bind(session.ended_at.map(time::to_db))
    .bind(time::to_db(session.created_at))
    .bind(time::to_db(session.updated_at))
    .bind(session.version)
    .execute(db)
    .await
    .map_err(|e| match Error::from(e) {
        err if err.is_unique_violation() => Error::ConcurrencyConflict(format!(
            "voter {} already has an active session",
            session.voter_id
        )),
        err => err,
    })?;

    Ok(())
}

/// Write the session's mutable fields if nobody else changed it first
///
/// On success the in-memory `version` is advanced to match the row.
pub async fn save<'e, E>(db: E, session: &mut TournamentSession) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE tournament_sessions
        SET current_champion_id = ?, challenger_id = ?, round = ?, is_active = ?,
            last_vote_at = ?, ended_at = ?, updated_at = ?, version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(session.current_champion_id.map(|id| id.to_string()))
    .bind(session.challenger_id.map(|id| id.to_string()))
    .bind(session.round)
    .bind(session.is_active as i64)
    .bind(time::to_db(session.last_vote_at))
    .bind(session.ended_at.map(time::to_db))
    .bind(time::to_db(session.updated_at))
    .bind(session.id.to_string())
    .bind(session.version)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::ConcurrencyConflict(format!(
            "session {} changed since version {}",
            session.id, session.version
        )));
    }

    session.version += 1;
    Ok(())
}

/// Most recent sessions of a voter, active or not, newest first
pub async fn recent_for_voter<'e, E>(
    db: E,
    voter_id: Uuid,
    limit: i64,
) -> Result<Vec<TournamentSession>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM tournament_sessions WHERE voter_id = ?
         ORDER BY created_at DESC, rowid DESC LIMIT ?",
        COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(voter_id.to_string())
        .bind(limit)
        .fetch_all(db)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Number of sessions ever started by a voter
pub async fn count_for_voter<'e, E>(db: E, voter_id: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tournament_sessions WHERE voter_id = ?")
        .bind(voter_id.to_string())
        .fetch_one(db)
        .await?;
    Ok(total)
}

/// Highest `round - 1` across the voter's sessions, 0 when none
pub async fn best_streak<'e, E>(db: E, voter_id: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let best: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(round - 1), 0) FROM tournament_sessions WHERE voter_id = ?",
    )
    .bind(voter_id.to_string())
    .fetch_one(db)
    .await?;
    Ok(best)
}
