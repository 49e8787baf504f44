//! Tests for database initialization
//!
//! Covers automatic creation, idempotent reopening, the constraint set the
//! core relies on (single active session, direct vote uniqueness,
//! non-negative counters) and connection pragmas.

use catmash_common::db::init::init_database;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn fresh_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("catmash.db")).await.unwrap();
    (dir, pool)
}

async fn seed_voter_and_candidate(pool: &SqlitePool) {
    sqlx::query("INSERT INTO voters (id, role, first_seen_at) VALUES ('v1', 'user', '2025-01-01T00:00:00.000000Z')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO candidates (id, image_ref, created_at, updated_at)
         VALUES ('c1', 'https://img/1.jpg', '2025-01-01T00:00:00.000000Z', '2025-01-01T00:00:00.000000Z')",
    )
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("sub").join("catmash.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catmash.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let (_dir, pool) = fresh_db().await;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in ["candidates", "schema_version", "tournament_sessions", "voters", "votes"] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn test_sessions_have_version_column() {
    let (_dir, pool) = fresh_db().await;

    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('tournament_sessions') WHERE name = 'version'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(has_column, 1);

    let stamped: i32 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stamped, catmash_common::db::CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_foreign_keys_enabled() {
    let (_dir, pool) = fresh_db().await;

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(enabled, 1);

    // Vote referencing unknown candidate and voter is rejected
    let result = sqlx::query(
        "INSERT INTO votes (id, candidate_id, voter_id, cast_at, mode)
         VALUES ('x', 'missing', 'missing', '2025-01-01T00:00:00.000000Z', 'direct')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_direct_vote_unique_but_tournament_votes_repeat() {
    let (_dir, pool) = fresh_db().await;
    seed_voter_and_candidate(&pool).await;

    let insert = |id: &'static str, mode: &'static str| {
        sqlx::query(
            "INSERT INTO votes (id, candidate_id, voter_id, cast_at, mode)
             VALUES (?, 'c1', 'v1', '2025-01-01T00:00:00.000000Z', ?)",
        )
        .bind(id)
        .bind(mode)
    };

    insert("a", "direct").execute(&pool).await.unwrap();
    assert!(insert("b", "direct").execute(&pool).await.is_err());

    insert("c", "tournament").execute(&pool).await.unwrap();
    insert("d", "tournament").execute(&pool).await.unwrap();
}

#[tokio::test]
async fn test_single_active_session_index() {
    let (_dir, pool) = fresh_db().await;
    seed_voter_and_candidate(&pool).await;

    let insert = |id: &'static str, active: i64| {
        sqlx::query(
            "INSERT INTO tournament_sessions
             (id, voter_id, round, is_active, started_at, last_vote_at, created_at, updated_at)
             VALUES (?, 'v1', 1, ?, 't', 't', 't', 't')",
        )
        .bind(id)
        .bind(active)
    };

    insert("s1", 1).execute(&pool).await.unwrap();
    assert!(insert("s2", 1).execute(&pool).await.is_err());

    // Inactive sessions are unconstrained
    insert("s3", 0).execute(&pool).await.unwrap();
    insert("s4", 0).execute(&pool).await.unwrap();
}

#[tokio::test]
async fn test_vote_count_cannot_go_negative() {
    let (_dir, pool) = fresh_db().await;
    seed_voter_and_candidate(&pool).await;

    let result = sqlx::query("UPDATE candidates SET vote_count = -1 WHERE id = 'c1'")
        .execute(&pool)
        .await;
    assert!(result.is_err());
}
