//! Shadow rows for principals supplied by the identity collaborator

use catmash_common::{time, Principal, Result};
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

/// Register the voter if unseen; an existing row is left untouched
pub async fn ensure_exists<'e, E>(db: E, voter_id: Uuid) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT OR IGNORE INTO voters (id, role, first_seen_at) VALUES (?, 'user', ?)")
        .bind(voter_id.to_string())
        .bind(time::to_db(time::now()))
        .execute(db)
        .await?;
    Ok(())
}

/// Register the principal, refreshing its role
///
/// Returns whether a row was written. A known voter with an unchanged role
/// costs one read and never takes the SQLite write lock.
pub async fn register<'e, E>(db: E, principal: &Principal) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite> + Copy,
{
    let voter_id = principal.voter_id.to_string();
    let role = principal.role.as_str();

    let known: Option<String> = sqlx::query_scalar("SELECT role FROM voters WHERE id = ?")
        .bind(&voter_id)
        .fetch_optional(db)
        .await?;
    if known.as_deref() == Some(role) {
        return Ok(false);
    }

    let result = sqlx::query(
        "INSERT INTO voters (id, role, first_seen_at) VALUES (?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET role = excluded.role
         WHERE voters.role != excluded.role",
    )
    .bind(&voter_id)
    .bind(role)
    .bind(time::to_db(time::now()))
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
