//! Direct (non-tournament) voting

use catmash_common::{Error, Result, Vote, VoteMode};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::db::{candidates, votes};

/// One vote per voter and candidate, outside any tournament
#[derive(Clone)]
pub struct DirectVoting {
    db: SqlitePool,
}

impl DirectVoting {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Vote for an active candidate
    ///
    /// The pre-check gives the common case a clean error; a racing duplicate
    /// is still caught by the unique index inside [`votes::record`].
    pub async fn vote_direct(&self, voter_id: Uuid, candidate_id: Uuid) -> Result<Vote> {
        candidates::find_active_by_id(&self.db, candidate_id).await?;

        if votes::has_voted(&self.db, candidate_id, voter_id).await? {
            return Err(Error::DuplicateVote {
                voter_id,
                candidate_id,
            });
        }

        let vote = votes::record(&self.db, candidate_id, voter_id, VoteMode::Direct).await?;
        debug!(%voter_id, %candidate_id, "Direct vote recorded");
        Ok(vote)
    }
}
