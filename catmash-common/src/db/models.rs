//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A votable image with its popularity counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    pub image_ref: String,
    pub vote_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// How a vote was cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteMode {
    /// Single vote for one candidate; unique per voter and candidate
    Direct,
    /// Winner of a tournament round; may repeat
    Tournament,
}

impl VoteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteMode::Direct => "direct",
            VoteMode::Tournament => "tournament",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "direct" => Ok(VoteMode::Direct),
            "tournament" => Ok(VoteMode::Tournament),
            other => Err(Error::Internal(format!("Unknown vote mode '{}'", other))),
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub voter_id: Uuid,
    pub cast_at: DateTime<Utc>,
    pub mode: VoteMode,
}

/// Vote enriched with the candidate it references
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteWithCandidate {
    #[serde(flatten)]
    pub vote: Vote,
    pub candidate: Candidate,
}

/// Per-voter tournament session row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSession {
    pub id: Uuid,
    pub voter_id: Uuid,
    pub current_champion_id: Option<Uuid>,
    pub challenger_id: Option<Uuid>,
    pub round: i64,
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    pub last_vote_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every mutation
    #[serde(skip)]
    pub version: i64,
}

/// Principal role supplied by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(Error::InvalidInput(format!("Unknown role '{}'", other))),
        }
    }
}

/// Authenticated caller, as forwarded by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub voter_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
