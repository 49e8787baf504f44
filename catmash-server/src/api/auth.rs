//! Voter identity extraction
//!
//! Identity is established upstream; the gateway forwards it as
//! `x-voter-id` (UUID) and `x-voter-role` (`user` | `admin`, default `user`).
//! Each principal seen here gets a shadow row in `voters`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use catmash_common::{uuid_utils, Principal, Role};
use tracing::warn;

use crate::db::voters;
use crate::error::ApiError;
use crate::AppState;

pub const VOTER_ID_HEADER: &str = "x-voter-id";
pub const VOTER_ROLE_HEADER: &str = "x-voter-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|s| Some(s.trim()))
            .map_err(|_| ApiError::Unauthenticated(format!("{} is not valid text", name))),
    }
}

/// Read the principal from request headers without touching the database
pub fn principal_from_parts(parts: &Parts) -> Result<Principal, ApiError> {
    let raw_id = header(parts, VOTER_ID_HEADER)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated(format!("missing {} header", VOTER_ID_HEADER)))?;

    let voter_id = uuid_utils::parse(raw_id).map_err(|_| {
        warn!("Rejected malformed voter id '{}'", raw_id);
        ApiError::Unauthenticated(format!("{} must be a UUID", VOTER_ID_HEADER))
    })?;

    let role = match header(parts, VOTER_ROLE_HEADER)?.filter(|s| !s.is_empty()) {
        Some(raw) => Role::parse(raw).map_err(|_| {
            ApiError::Unauthenticated(format!("unknown role '{}'", raw))
        })?,
        None => Role::User,
    };

    Ok(Principal { voter_id, role })
}

/// Any authenticated voter
#[derive(Debug, Clone, Copy)]
pub struct CurrentVoter(pub Principal);

/// An authenticated voter with the admin role
#[derive(Debug, Clone, Copy)]
pub struct AdminVoter(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for CurrentVoter {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = principal_from_parts(parts)?;
        voters::register(&state.db, &principal).await?;
        Ok(CurrentVoter(principal))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminVoter {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentVoter(principal) = CurrentVoter::from_request_parts(parts, state).await?;
        if !principal.is_admin() {
            return Err(ApiError::Forbidden("admin role required".to_string()));
        }
        Ok(AdminVoter(principal))
    }
}
