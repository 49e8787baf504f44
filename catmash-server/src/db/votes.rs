//! Vote ledger
//!
//! Append-only. Recording a vote and bumping the candidate counter happen in
//! the same transaction, so `candidates.vote_count` always equals the number
//! of vote rows referencing the candidate.

use catmash_common::{time, Candidate, Error, Result, Vote, VoteMode, VoteWithCandidate};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{candidates, get_opt_time, get_time, get_uuid, voters};

fn from_row(row: &SqliteRow) -> Result<Vote> {
    let mode: String = row.try_get("mode")?;
    Ok(Vote {
        id: get_uuid(row, "id")?,
        candidate_id: get_uuid(row, "candidate_id")?,
        voter_id: get_uuid(row, "voter_id")?,
        cast_at: get_time(row, "cast_at")?,
        mode: VoteMode::parse(&mode)?,
    })
}

/// Record a vote in its own transaction
pub async fn record(
    pool: &SqlitePool,
    candidate_id: Uuid,
    voter_id: Uuid,
    mode: VoteMode,
) -> Result<Vote> {
    let mut tx = pool.begin().await?;
    let vote = record_with(&mut tx, candidate_id, voter_id, mode, time::now()).await?;
    tx.commit().await?;
    Ok(vote)
}

/// Record a vote on a caller-supplied connection
///
/// Must run inside a transaction: the insert and the counter increment
/// succeed or fail together only if the caller commits them as one unit.
pub async fn record_with(
    conn: &mut SqliteConnection,
    candidate_id: Uuid,
    voter_id: Uuid,
    mode: VoteMode,
    cast_at: DateTime<Utc>,
) -> Result<Vote> {
    voters::ensure_exists(&mut *conn, voter_id).await?;

    let vote = Vote {
        id: Uuid::new_v4(),
        candidate_id,
        voter_id,
        cast_at,
        mode,
    };

    // Increment first: it doubles as the "candidate is active" check
    candidates::increment_vote(&mut *conn, candidate_id).await?;

    sqlx::query(
        "INSERT INTO votes (id, candidate_id, voter_id, cast_at, mode) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(vote.id.to_string())
    .bind(candidate_id.to_string())
    .bind(voter_id.to_string())
    .bind(time::to_db(cast_at))
    .bind(mode.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| match Error::from(e) {
        err if err.is_unique_violation() => Error::DuplicateVote {
            voter_id,
            candidate_id,
        },
        err => err,
    })?;

    Ok(vote)
}

/// Whether the voter already cast a direct vote for the candidate
pub async fn has_voted<'e, E>(db: E, candidate_id: Uuid, voter_id: Uuid) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let known: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM votes WHERE candidate_id = ? AND voter_id = ? AND mode = 'direct')",
    )
    .bind(candidate_id.to_string())
    .bind(voter_id.to_string())
    .fetch_one(db)
    .await?;
    Ok(known)
}

/// All votes of a voter, newest first, with their candidates
///
/// Soft-deleted candidates are included: history keeps its targets.
pub async fn votes_for_voter<'e, E>(db: E, voter_id: Uuid) -> Result<Vec<VoteWithCandidate>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT v.id, v.candidate_id, v.voter_id, v.cast_at, v.mode,
               c.image_ref, c.vote_count, c.created_at, c.updated_at, c.deleted_at
        FROM votes v
        JOIN candidates c ON c.id = v.candidate_id
        WHERE v.voter_id = ?
        ORDER BY v.cast_at DESC, v.rowid DESC
        "#,
    )
    .bind(voter_id.to_string())
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| -> Result<VoteWithCandidate> {
            let vote = from_row(row)?;
            let candidate = Candidate {
                id: vote.candidate_id,
                image_ref: row.try_get("image_ref")?,
                vote_count: row.try_get("vote_count")?,
                created_at: get_time(row, "created_at")?,
                updated_at: get_time(row, "updated_at")?,
                deleted_at: get_opt_time(row, "deleted_at")?,
            };
            Ok(VoteWithCandidate { vote, candidate })
        })
        .collect()
}

/// Votes of a voter cast at or after `since`, oldest first
pub async fn votes_since<'e, E>(db: E, voter_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Vote>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, candidate_id, voter_id, cast_at, mode FROM votes
         WHERE voter_id = ? AND cast_at >= ?
         ORDER BY cast_at ASC, rowid ASC",
    )
    .bind(voter_id.to_string())
    .bind(time::to_db(since))
    .fetch_all(db)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Number of votes cast at or after `since`, all voters
pub async fn votes_in_window<'e, E>(db: E, since: DateTime<Utc>) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE cast_at >= ?")
        .bind(time::to_db(since))
        .fetch_one(db)
        .await?;
    Ok(total)
}

/// Total number of vote rows
pub async fn count<'e, E>(db: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
        .fetch_one(db)
        .await?;
    Ok(total)
}

/// Number of vote rows referencing a candidate
pub async fn count_for_candidate<'e, E>(db: E, candidate_id: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE candidate_id = ?")
        .bind(candidate_id.to_string())
        .fetch_one(db)
        .await?;
    Ok(total)
}

/// Distinct active candidates the voter has voted for
pub async fn distinct_active_candidates_for_voter<'e, E>(db: E, voter_id: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(DISTINCT v.candidate_id) FROM votes v
         JOIN candidates c ON c.id = v.candidate_id
         WHERE v.voter_id = ? AND c.deleted_at IS NULL",
    )
    .bind(voter_id.to_string())
    .fetch_one(db)
    .await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn setup_test_db() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let pool = catmash_common::db::init_database(&dir.path().join("catmash.db"))
            .await
            .unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn test_record_bumps_counter() {
        let (_dir, pool) = setup_test_db().await;
        let cat = candidates::create(&pool, "https://cdn.example.com/a.jpg").await.unwrap();
        let voter = Uuid::new_v4();

        let vote = record(&pool, cat.id, voter, VoteMode::Direct).await.unwrap();
        assert_eq!(vote.candidate_id, cat.id);
        assert_eq!(vote.voter_id, voter);

        let cat = candidates::find_active_by_id(&pool, cat.id).await.unwrap();
        assert_eq!(cat.vote_count, 1);
        assert_eq!(count_for_candidate(&pool, cat.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_for_missing_candidate_leaves_no_row() {
        let (_dir, pool) = setup_test_db().await;

        let err = record(&pool, Uuid::new_v4(), Uuid::new_v4(), VoteMode::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_direct_vote_rolls_back_increment() {
        let (_dir, pool) = setup_test_db().await;
        let cat = candidates::create(&pool, "https://cdn.example.com/a.jpg").await.unwrap();
        let voter = Uuid::new_v4();

        record(&pool, cat.id, voter, VoteMode::Direct).await.unwrap();
        let err = record(&pool, cat.id, voter, VoteMode::Direct).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateVote { .. }));

        let cat = candidates::find_active_by_id(&pool, cat.id).await.unwrap();
        assert_eq!(cat.vote_count, 1);
        assert_eq!(count_for_candidate(&pool, cat.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_has_voted_ignores_tournament_votes() {
        let (_dir, pool) = setup_test_db().await;
        let cat = candidates::create(&pool, "https://cdn.example.com/a.jpg").await.unwrap();
        let voter = Uuid::new_v4();

        record(&pool, cat.id, voter, VoteMode::Tournament).await.unwrap();
        assert!(!has_voted(&pool, cat.id, voter).await.unwrap());

        record(&pool, cat.id, voter, VoteMode::Direct).await.unwrap();
        assert!(has_voted(&pool, cat.id, voter).await.unwrap());
    }

    #[tokio::test]
    async fn test_window_and_since_queries() {
        let (_dir, pool) = setup_test_db().await;
        let cat = candidates::create(&pool, "https://cdn.example.com/a.jpg").await.unwrap();
        let voter = Uuid::new_v4();
        let now = time::now();

        let mut tx = pool.begin().await.unwrap();
        record_with(&mut tx, cat.id, voter, VoteMode::Tournament, now - Duration::hours(30))
            .await
            .unwrap();
        record_with(&mut tx, cat.id, voter, VoteMode::Tournament, now - Duration::hours(1))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(votes_in_window(&pool, now - Duration::hours(24)).await.unwrap(), 1);
        assert_eq!(count(&pool).await.unwrap(), 2);

        let recent = votes_since(&pool, voter, now - Duration::hours(2)).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert!(votes_since(&pool, Uuid::new_v4(), now - Duration::hours(48))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_votes_for_voter_newest_first() {
        let (_dir, pool) = setup_test_db().await;
        let a = candidates::create(&pool, "https://cdn.example.com/a.jpg").await.unwrap();
        let b = candidates::create(&pool, "https://cdn.example.com/b.jpg").await.unwrap();
        let voter = Uuid::new_v4();
        let now = time::now();

        let mut tx = pool.begin().await.unwrap();
        record_with(&mut tx, a.id, voter, VoteMode::Direct, now - Duration::minutes(5))
            .await
            .unwrap();
        record_with(&mut tx, b.id, voter, VoteMode::Direct, now).await.unwrap();
        tx.commit().await.unwrap();

        let history = votes_for_voter(&pool, voter).await.unwrap();
        let ids: Vec<Uuid> = history.iter().map(|v| v.candidate.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert_eq!(history[0].candidate.vote_count, 1);
    }
}
