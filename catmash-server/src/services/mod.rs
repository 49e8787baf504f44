//! Core services: tournament sessions, direct voting, ranking and import

pub mod importer;
pub mod ranking;
pub mod tournament;
pub mod voting;

pub use importer::ImportSummary;
pub use ranking::{GlobalStats, HistoryStats, RankingService, UserHistory};
pub use tournament::{EndResult, TournamentEngine, TournamentPair, TournamentStats, VoteResult};
pub use voting::DirectVoting;
