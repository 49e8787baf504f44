//! Tournament session endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use catmash_common::uuid_utils;

use crate::api::auth::CurrentVoter;
use crate::error::ApiResult;
use crate::services::{EndResult, TournamentPair, TournamentStats, VoteResult};
use crate::AppState;

/// POST /votes/tournament/start
pub async fn start(
    State(state): State<AppState>,
    CurrentVoter(voter): CurrentVoter,
) -> ApiResult<Json<TournamentPair>> {
    Ok(Json(state.tournament.start_tournament(voter.voter_id).await?))
}

/// GET /votes/tournament/current-pair
pub async fn current_pair(
    State(state): State<AppState>,
    CurrentVoter(voter): CurrentVoter,
) -> ApiResult<Json<TournamentPair>> {
    Ok(Json(state.tournament.current_pair(voter.voter_id).await?))
}

/// POST /votes/tournament/vote/:winnerId
pub async fn vote(
    State(state): State<AppState>,
    CurrentVoter(voter): CurrentVoter,
    Path(winner_id): Path<String>,
) -> ApiResult<Json<VoteResult>> {
    let winner_id = uuid_utils::parse(&winner_id)?;
    Ok(Json(state.tournament.vote(voter.voter_id, winner_id).await?))
}

/// GET /votes/tournament/stats
pub async fn stats(
    State(state): State<AppState>,
    CurrentVoter(voter): CurrentVoter,
) -> ApiResult<Json<TournamentStats>> {
    Ok(Json(state.tournament.stats(voter.voter_id).await?))
}

/// POST /votes/tournament/end
pub async fn end(
    State(state): State<AppState>,
    CurrentVoter(voter): CurrentVoter,
) -> ApiResult<Json<EndResult>> {
    Ok(Json(state.tournament.end(voter.voter_id).await?))
}

pub fn tournament_routes() -> Router<AppState> {
    Router::new()
        .route("/votes/tournament/start", post(start))
        .route("/votes/tournament/current-pair", get(current_pair))
        .route("/votes/tournament/vote/:winner_id", post(vote))
        .route("/votes/tournament/stats", get(stats))
        .route("/votes/tournament/end", post(end))
}
