//! catmash-server library
//!
//! Voting-based image ranking: pairwise tournament sessions, direct votes
//! and popularity ranking over a SQLite store.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod random;
pub mod services;

use random::{RandomSource, ThreadRandom};
use services::{DirectVoting, RankingService, TournamentEngine};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub tournament: TournamentEngine,
    pub ranking: RankingService,
    pub voting: DirectVoting,
    /// Server start time, for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State backed by the thread-local RNG
    pub fn new(db: SqlitePool) -> Self {
        Self::with_random(db, Arc::new(ThreadRandom))
    }

    /// State with an explicit random source (seeded in tests)
    pub fn with_random(db: SqlitePool, random: Arc<dyn RandomSource>) -> Self {
        Self {
            tournament: TournamentEngine::new(db.clone(), random),
            ranking: RankingService::new(db.clone()),
            voting: DirectVoting::new(db.clone()),
            db,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::cat_routes())
        .merge(api::tournament_routes())
        .merge(api::vote_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
