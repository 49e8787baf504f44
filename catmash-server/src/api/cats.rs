//! Candidate catalogue endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use catmash_common::{uuid_utils, Candidate};
use serde::Deserialize;
use tracing::info;

use crate::api::auth::AdminVoter;
use crate::db::candidates;
use crate::error::{ApiError, ApiResult};
use crate::services::GlobalStats;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCatRequest {
    pub image: String,
}

/// GET /cats
pub async fn list_cats(State(state): State<AppState>) -> ApiResult<Json<Vec<Candidate>>> {
    Ok(Json(candidates::list_active(&state.db).await?))
}

/// GET /cats/stats
pub async fn global_stats(State(state): State<AppState>) -> ApiResult<Json<GlobalStats>> {
    Ok(Json(state.ranking.global_stats().await?))
}

/// GET /cats/ranking
pub async fn full_ranking(State(state): State<AppState>) -> ApiResult<Json<Vec<Candidate>>> {
    Ok(Json(state.ranking.full_ranking().await?))
}

/// GET /cats/:id
pub async fn get_cat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Candidate>> {
    let id = uuid_utils::parse(&id)?;
    Ok(Json(candidates::find_active_by_id(&state.db, id).await?))
}

/// POST /cats (admin)
pub async fn create_cat(
    State(state): State<AppState>,
    AdminVoter(admin): AdminVoter,
    body: Result<Json<CreateCatRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Candidate>)> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let candidate = candidates::create(&state.db, request.image.trim()).await?;
    info!(admin = %admin.voter_id, candidate_id = %candidate.id, "Candidate created");
    Ok((StatusCode::CREATED, Json(candidate)))
}

/// DELETE /cats/:id (admin)
pub async fn delete_cat(
    State(state): State<AppState>,
    AdminVoter(admin): AdminVoter,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = uuid_utils::parse(&id)?;
    candidates::soft_delete(&state.db, id).await?;
    info!(admin = %admin.voter_id, candidate_id = %id, "Candidate removed");
    Ok(StatusCode::NO_CONTENT)
}

pub fn cat_routes() -> Router<AppState> {
    Router::new()
        .route("/cats", get(list_cats).post(create_cat))
        .route("/cats/stats", get(global_stats))
        .route("/cats/ranking", get(full_ranking))
        .route("/cats/:id", get(get_cat).delete(delete_cat))
}
