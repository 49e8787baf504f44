//! Shared fixtures for catmash-server integration tests
#![allow(dead_code)]

use std::sync::Arc;

use catmash_common::db::init_database;
use catmash_common::Candidate;
use catmash_server::db::candidates;
use catmash_server::random::SeededRandom;
use catmash_server::services::TournamentEngine;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Fresh database in a temporary folder; keep the `TempDir` alive
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("catmash.db")).await.unwrap();
    (dir, pool)
}

/// Insert `n` candidates in order
pub async fn seed_candidates(pool: &SqlitePool, n: usize) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let url = format!("https://cdn.example.com/cats/{}.jpg", i);
        out.push(candidates::create(pool, &url).await.unwrap());
    }
    out
}

pub fn engine(pool: &SqlitePool, seed: u64) -> TournamentEngine {
    TournamentEngine::new(pool.clone(), Arc::new(SeededRandom::new(seed)))
}

pub async fn active_session_count(pool: &SqlitePool, voter_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tournament_sessions WHERE voter_id = ? AND is_active = 1")
        .bind(voter_id.to_string())
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Fails if any candidate's counter disagrees with its vote rows
pub async fn assert_counters_match_ledger(pool: &SqlitePool) {
    let mismatched: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM candidates c
         WHERE c.vote_count != (SELECT COUNT(*) FROM votes v WHERE v.candidate_id = c.id)",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(mismatched, 0, "vote_count out of sync with the vote ledger");
}
