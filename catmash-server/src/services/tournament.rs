//! Tournament session engine
//!
//! A voter's session moves from no session, to awaiting a vote on
//! (champion, challenger), to completed once every active candidate has
//! taken part. Each state transition runs in one SQLite transaction. Session
//! writes are version-checked, so two racing votes on the same session
//! cannot both commit.

use catmash_common::{time, Candidate, Error, Result, TournamentSession, VoteMode};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{candidates, sessions, voters, votes};
use crate::random::RandomSource;

/// Number of past sessions carried in a stats snapshot
pub const SESSION_HISTORY_LIMIT: i64 = 10;

/// The pair currently awaiting the voter's choice
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentPair {
    pub champion: Candidate,
    pub challenger: Candidate,
    pub round: i64,
    pub session_id: Uuid,
    pub is_complete: bool,
    pub total_cats: i64,
    pub remaining_cats: i64,
}

/// Outcome of a tournament vote
///
/// The completion fields are only present when the vote exhausted the pool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResult {
    pub winner: Candidate,
    pub loser: Candidate,
    pub next_challenger: Option<Candidate>,
    pub round: i64,
    pub is_new_champion: bool,
    pub streak: i64,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_winner: Option<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<i64>,
}

/// Snapshot of the voter's tournament progress
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentStats {
    pub current_champion: Option<Candidate>,
    pub round: i64,
    pub total_votes: i64,
    pub session_duration: i64,
    pub is_active: bool,
    pub streak: i64,
    pub sessions_history: Vec<TournamentSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cats: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_cats: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
}

/// Result of explicitly ending a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndResult {
    /// `None` when the champion has been removed since
    pub final_champion: Option<Candidate>,
    pub total_rounds: i64,
    pub session_duration: i64,
}

enum VoteOutcome {
    Recorded(VoteResult),
    PairReplaced,
}

fn remaining_cats(total: i64, round: i64) -> i64 {
    (total - round - 1).max(0)
}

fn progress_percent(round: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (round as f64 / total as f64 * 100.0).round() as i64
}

/// SQLite busy/locked on a session mutation means another writer got there first
fn lock_to_conflict(err: Error) -> Error {
    if err.is_lock_contention() {
        warn!("Session write hit lock contention: {}", err);
        Error::ConcurrencyConflict(err.to_string())
    } else {
        err
    }
}

fn pair_ids(session: &TournamentSession) -> Result<(Uuid, Uuid)> {
    match (session.current_champion_id, session.challenger_id) {
        (Some(champion), Some(challenger)) => Ok((champion, challenger)),
        _ => Err(Error::Internal(format!(
            "session {} has lost its champion or challenger",
            session.id
        ))),
    }
}

/// Pairwise elimination tournament, one session per voter
#[derive(Clone)]
pub struct TournamentEngine {
    db: SqlitePool,
    random: Arc<dyn RandomSource>,
}

impl TournamentEngine {
    pub fn new(db: SqlitePool, random: Arc<dyn RandomSource>) -> Self {
        Self { db, random }
    }

    /// Start a fresh session, replacing any active one
    pub async fn start_tournament(&self, voter_id: Uuid) -> Result<TournamentPair> {
        self.start_inner(voter_id).await.map_err(lock_to_conflict)
    }

    async fn start_inner(&self, voter_id: Uuid) -> Result<TournamentPair> {
        let mut tx = self.db.begin().await?;
        let now = time::now();

        voters::ensure_exists(&mut *tx, voter_id).await?;
        sessions::deactivate_active(&mut *tx, voter_id, now).await?;

        let (champion, challenger) =
            candidates::select_random_pair(&mut tx, self.random.as_ref()).await?;
        let session = sessions::new_session(voter_id, champion.id, challenger.id, now);
        sessions::insert(&mut *tx, &session).await?;

        let total_cats = candidates::count(&mut *tx).await?;
        tx.commit().await?;

        info!(%voter_id, session_id = %session.id, total_cats, "Tournament started");

        Ok(TournamentPair {
            champion,
            challenger,
            round: session.round,
            session_id: session.id,
            is_complete: false,
            total_cats,
            remaining_cats: remaining_cats(total_cats, session.round),
        })
    }

    /// The pair awaiting a vote, starting a session when none is active
    ///
    /// Pair members removed since the last vote are replaced first.
    pub async fn current_pair(&self, voter_id: Uuid) -> Result<TournamentPair> {
        if let Some(session) = sessions::find_active(&self.db, voter_id).await? {
            return self.pair_for(session).await;
        }

        debug!(%voter_id, "No active session, starting one");
        match self.start_tournament(voter_id).await {
            Ok(pair) => Ok(pair),
            Err(Error::ConcurrencyConflict(reason)) => {
                // A concurrent request started the session for us
                match sessions::find_active(&self.db, voter_id).await? {
                    Some(session) => self.pair_for(session).await,
                    None => Err(Error::ConcurrencyConflict(reason)),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn pair_for(&self, session: TournamentSession) -> Result<TournamentPair> {
        let (champion_id, challenger_id) = pair_ids(&session)?;

        let champion = candidates::find_active(&self.db, champion_id).await?;
        let challenger = candidates::find_active(&self.db, challenger_id).await?;
        let (session, champion, challenger) = match (champion, challenger) {
            (Some(champion), Some(challenger)) => (session, champion, challenger),
            _ => self
                .repair_active(session.voter_id)
                .await
                .map_err(lock_to_conflict)?,
        };
        let total_cats = candidates::count(&self.db).await?;

        Ok(TournamentPair {
            champion,
            challenger,
            round: session.round,
            session_id: session.id,
            is_complete: false,
            total_cats,
            remaining_cats: remaining_cats(total_cats, session.round),
        })
    }

    async fn repair_active(
        &self,
        voter_id: Uuid,
    ) -> Result<(TournamentSession, Candidate, Candidate)> {
        let mut tx = self.db.begin().await?;
        let mut session = sessions::find_active(&mut *tx, voter_id)
            .await?
            .ok_or(Error::NoActiveSession(voter_id))?;
        let (champion, challenger) = self.refresh_pair(&mut tx, &mut session).await?;
        tx.commit().await?;
        Ok((session, champion, challenger))
    }

    /// Live pair of the session, replacing members removed from the pool
    ///
    /// The session is saved only when a member changed. Replacements prefer
    /// candidates the voter has not seen in this session.
    async fn refresh_pair(
        &self,
        conn: &mut SqliteConnection,
        session: &mut TournamentSession,
    ) -> Result<(Candidate, Candidate)> {
        let (champion_id, challenger_id) = pair_ids(session)?;
        let champion = candidates::find_active(&mut *conn, champion_id).await?;
        let challenger = candidates::find_active(&mut *conn, challenger_id).await?;

        let (champion, challenger) = match (champion, challenger) {
            (Some(champion), Some(challenger)) => return Ok((champion, challenger)),
            pair => pair,
        };

        let available = candidates::count(&mut *conn).await?;
        if available < 2 {
            return Err(Error::InsufficientCandidates { available });
        }

        let mut seen: HashSet<Uuid> =
            votes::votes_since(&mut *conn, session.voter_id, session.started_at)
                .await?
                .into_iter()
                .map(|v| v.candidate_id)
                .collect();
        seen.insert(champion_id);
        seen.insert(challenger_id);

        let champion = match champion {
            Some(champion) => champion,
            None => {
                let picked = self.replacement(conn, &seen, challenger_id).await?;
                seen.insert(picked.id);
                picked
            }
        };
        let challenger = match challenger {
            Some(challenger) => challenger,
            None => self.replacement(conn, &seen, champion.id).await?,
        };

        warn!(
            voter_id = %session.voter_id,
            session_id = %session.id,
            champion = %champion.id,
            challenger = %challenger.id,
            "Replaced removed candidate in tournament pair"
        );

        session.current_champion_id = Some(champion.id);
        session.challenger_id = Some(challenger.id);
        session.updated_at = time::now();
        sessions::save(&mut *conn, session).await?;

        Ok((champion, challenger))
    }

    async fn replacement(
        &self,
        conn: &mut SqliteConnection,
        seen: &HashSet<Uuid>,
        partner: Uuid,
    ) -> Result<Candidate> {
        if let Some(candidate) =
            candidates::select_random_excluding(&mut *conn, self.random.as_ref(), seen).await?
        {
            return Ok(candidate);
        }

        let partner_only: HashSet<Uuid> = [partner].into_iter().collect();
        let available = candidates::count(&mut *conn).await?;
        candidates::select_random_excluding(&mut *conn, self.random.as_ref(), &partner_only)
            .await?
            .ok_or(Error::InsufficientCandidates { available })
    }

    /// Record the voter's choice between champion and challenger
    ///
    /// A winner removed from the pool since the pair was shown is not
    /// counted: the pair is refreshed and the vote fails with
    /// `ConcurrencyConflict` so the client fetches the new pair.
    pub async fn vote(&self, voter_id: Uuid, winner_id: Uuid) -> Result<VoteResult> {
        let mut tx = self.db.begin().await?;
        let outcome = self
            .vote_in(&mut tx, voter_id, winner_id)
            .await
            .map_err(lock_to_conflict)?;
        tx.commit().await.map_err(|e| lock_to_conflict(e.into()))?;

        match outcome {
            VoteOutcome::Recorded(result) => Ok(result),
            VoteOutcome::PairReplaced => Err(Error::ConcurrencyConflict(format!(
                "candidate {} was removed, the pair has been replaced",
                winner_id
            ))),
        }
    }

    async fn vote_in(
        &self,
        conn: &mut SqliteConnection,
        voter_id: Uuid,
        winner_id: Uuid,
    ) -> Result<VoteOutcome> {
        let mut session = sessions::find_active(&mut *conn, voter_id)
            .await?
            .ok_or(Error::NoActiveSession(voter_id))?;
        let (champion_id, challenger_id) = pair_ids(&session)?;

        let loser_id = if winner_id == champion_id {
            challenger_id
        } else if winner_id == challenger_id {
            champion_id
        } else {
            return Err(Error::WinnerNotInPair(winner_id));
        };

        if candidates::find_active(&mut *conn, winner_id).await?.is_none() {
            self.refresh_pair(conn, &mut session).await?;
            return Ok(VoteOutcome::PairReplaced);
        }

        let now = time::now();
        let is_new_champion = winner_id != champion_id;
        let streak = session.round;

        votes::record_with(&mut *conn, winner_id, voter_id, VoteMode::Tournament, now).await?;

        let winner = candidates::find_by_id(&mut *conn, winner_id).await?;
        let loser = candidates::find_by_id(&mut *conn, loser_id).await?;
        let total_cats = candidates::count(&mut *conn).await?;
        let cats_used = session.round + 1;

        if cats_used >= total_cats {
            session.is_active = false;
            session.ended_at = Some(now);
            session.round += 1;
            session.updated_at = now;
            sessions::save(&mut *conn, &mut session).await?;

            let duration = time::elapsed_minutes(session.started_at, now);
            info!(
                %voter_id,
                session_id = %session.id,
                total_rounds = session.round,
                "Tournament completed"
            );

            return Ok(VoteOutcome::Recorded(VoteResult {
                winner: winner.clone(),
                loser,
                next_challenger: None,
                round: session.round,
                is_new_champion,
                streak,
                is_complete: true,
                final_winner: Some(winner),
                total_rounds: Some(session.round),
                session_duration: Some(duration),
            }));
        }

        let mut used: HashSet<Uuid> = votes::votes_since(&mut *conn, voter_id, session.started_at)
            .await?
            .into_iter()
            .map(|v| v.candidate_id)
            .collect();
        used.insert(winner_id);
        used.insert(loser_id);

        let next = match candidates::select_random_excluding(&mut *conn, self.random.as_ref(), &used)
            .await?
        {
            Some(candidate) => candidate,
            None => {
                warn!(
                    %voter_id,
                    excluded = used.len(),
                    "No unused candidate left, falling back to any candidate"
                );
                candidates::select_random(&mut *conn, self.random.as_ref())
                    .await?
                    .ok_or(Error::EmptyPool)?
            }
        };

        session.current_champion_id = Some(winner_id);
        session.challenger_id = Some(next.id);
        session.round += 1;
        session.last_vote_at = now;
        session.updated_at = now;
        sessions::save(&mut *conn, &mut session).await?;

        debug!(
            %voter_id,
            %winner_id,
            next_challenger = %next.id,
            round = session.round,
            "Tournament vote recorded"
        );

        Ok(VoteOutcome::Recorded(VoteResult {
            winner,
            loser,
            next_challenger: Some(next),
            round: session.round,
            is_new_champion,
            streak,
            is_complete: false,
            final_winner: None,
            total_rounds: None,
            session_duration: None,
        }))
    }

    /// Progress snapshot plus the voter's recent sessions
    pub async fn stats(&self, voter_id: Uuid) -> Result<TournamentStats> {
        let mut conn = self.db.acquire().await?;
        let sessions_history =
            sessions::recent_for_voter(&mut *conn, voter_id, SESSION_HISTORY_LIMIT).await?;

        let session = match sessions::find_active(&mut *conn, voter_id).await? {
            Some(session) => session,
            None => {
                return Ok(TournamentStats {
                    current_champion: None,
                    round: 0,
                    total_votes: 0,
                    session_duration: 0,
                    is_active: false,
                    streak: 0,
                    sessions_history,
                    total_cats: None,
                    remaining_cats: None,
                    progress: None,
                })
            }
        };

        let current_champion = match session.current_champion_id {
            Some(id) => candidates::find_active(&mut *conn, id).await?,
            None => None,
        };
        let total_cats = candidates::count(&mut *conn).await?;

        Ok(TournamentStats {
            current_champion,
            round: session.round,
            total_votes: session.round - 1,
            session_duration: time::elapsed_minutes(session.started_at, time::now()),
            is_active: true,
            streak: session.round - 1,
            sessions_history,
            total_cats: Some(total_cats),
            remaining_cats: Some(remaining_cats(total_cats, session.round)),
            progress: Some(progress_percent(session.round, total_cats)),
        })
    }

    /// End the active session without advancing the round
    pub async fn end(&self, voter_id: Uuid) -> Result<EndResult> {
        self.end_inner(voter_id).await.map_err(lock_to_conflict)
    }

    async fn end_inner(&self, voter_id: Uuid) -> Result<EndResult> {
        let mut tx = self.db.begin().await?;
        let mut session = sessions::find_active(&mut *tx, voter_id)
            .await?
            .ok_or(Error::NoActiveSession(voter_id))?;

        let now = time::now();
        session.is_active = false;
        session.ended_at = Some(now);
        session.updated_at = now;
        sessions::save(&mut *tx, &mut session).await?;

        let final_champion = match session.current_champion_id {
            Some(id) => candidates::find_active(&mut *tx, id).await?,
            None => None,
        };
        tx.commit().await?;

        info!(%voter_id, session_id = %session.id, total_rounds = session.round, "Tournament ended");

        Ok(EndResult {
            final_champion,
            total_rounds: session.round,
            session_duration: time::elapsed_minutes(session.started_at, now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_cats_floors_at_zero() {
        assert_eq!(remaining_cats(5, 1), 3);
        assert_eq!(remaining_cats(3, 2), 0);
        assert_eq!(remaining_cats(2, 4), 0);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(1, 0), 0);
    }

    #[test]
    fn test_non_lock_errors_pass_through() {
        let passthrough = lock_to_conflict(Error::EmptyPool);
        assert!(matches!(passthrough, Error::EmptyPool));
    }
}
