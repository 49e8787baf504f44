//! Ranking and statistics aggregation over the candidate store and vote ledger

use catmash_common::{time, Candidate, Result, VoteWithCandidate};
use chrono::Duration;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{candidates, sessions, votes};

/// Candidates shown in the global podium and in a voter's favourites
pub const TOP_N: i64 = 3;

/// Window for `recentVotes`
pub const RECENT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_cats: i64,
    pub total_votes: i64,
    pub top_cats: Vec<Candidate>,
    pub recent_votes: i64,
}

/// Coverage of the pool by one voter, served under `GET /votes/history`
///
/// `total_voted` counts distinct active candidates, not vote rows; a
/// candidate voted for in several tournaments counts once. The row count is
/// [`UserHistory::total_votes`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_voted: i64,
    /// Percentage of the active pool this voter has voted for
    pub voting_rate: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHistory {
    pub votes: Vec<VoteWithCandidate>,
    pub total_votes: i64,
    pub favorite_cats: Vec<Candidate>,
    pub total_tournaments_played: i64,
    pub best_streak: i64,
    pub stats: HistoryStats,
}

fn voting_rate(voted: i64, pool: i64) -> i64 {
    if pool <= 0 {
        return 0;
    }
    (voted as f64 / pool as f64 * 100.0).round() as i64
}

/// Read-only aggregates; nothing here mutates state
#[derive(Clone)]
pub struct RankingService {
    db: SqlitePool,
}

impl RankingService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let since = time::now() - Duration::hours(RECENT_WINDOW_HOURS);

        Ok(GlobalStats {
            total_cats: candidates::count(&self.db).await?,
            total_votes: votes::count(&self.db).await?,
            top_cats: candidates::ranked(&self.db, Some(TOP_N)).await?,
            recent_votes: votes::votes_in_window(&self.db, since).await?,
        })
    }

    /// Active candidates by vote count, ties in insertion order
    pub async fn full_ranking(&self) -> Result<Vec<Candidate>> {
        candidates::ranked(&self.db, None).await
    }

    pub async fn user_history(&self, voter_id: Uuid) -> Result<UserHistory> {
        let history = votes::votes_for_voter(&self.db, voter_id).await?;
        let favorite_cats = candidates::top_voted_by(&self.db, voter_id, TOP_N).await?;
        let total_tournaments_played = sessions::count_for_voter(&self.db, voter_id).await?;
        let best_streak = sessions::best_streak(&self.db, voter_id).await?;

        let total_voted = votes::distinct_active_candidates_for_voter(&self.db, voter_id).await?;
        let pool = candidates::count(&self.db).await?;

        Ok(UserHistory {
            total_votes: history.len() as i64,
            votes: history,
            favorite_cats,
            total_tournaments_played,
            best_streak,
            stats: HistoryStats {
                total_voted,
                voting_rate: voting_rate(total_voted, pool),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voting_rate() {
        assert_eq!(voting_rate(0, 0), 0);
        assert_eq!(voting_rate(1, 3), 33);
        assert_eq!(voting_rate(2, 3), 67);
        assert_eq!(voting_rate(4, 4), 100);
    }
}
