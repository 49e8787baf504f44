//! Direct voting and voter history endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use catmash_common::{uuid_utils, Vote};

use crate::api::auth::CurrentVoter;
use crate::error::ApiResult;
use crate::services::UserHistory;
use crate::AppState;

/// POST /votes/:catId
pub async fn vote_direct(
    State(state): State<AppState>,
    CurrentVoter(voter): CurrentVoter,
    Path(cat_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Vote>)> {
    let cat_id = uuid_utils::parse(&cat_id)?;
    let vote = state.voting.vote_direct(voter.voter_id, cat_id).await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

/// GET /votes/history
pub async fn history(
    State(state): State<AppState>,
    CurrentVoter(voter): CurrentVoter,
) -> ApiResult<Json<UserHistory>> {
    Ok(Json(state.ranking.user_history(voter.voter_id).await?))
}

pub fn vote_routes() -> Router<AppState> {
    Router::new()
        .route("/votes/history", get(history))
        .route("/votes/:cat_id", post(vote_direct))
}
