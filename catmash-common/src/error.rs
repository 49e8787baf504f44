//! Common error types for CatMash

use thiserror::Error;

/// Common result type for CatMash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the core and the HTTP layer
///
/// Every variant maps to a stable identifier via [`Error::code`] so callers
/// can present differentiated messages.
#[derive(Error, Debug)]
pub enum Error {
    /// Candidate, session or voter lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Fewer than two active candidates when a pair is required
    #[error("Insufficient candidates: {available} active, at least 2 required")]
    InsufficientCandidates { available: i64 },

    /// No active candidates where at least one is required
    #[error("Candidate pool is empty")]
    EmptyPool,

    /// Voter already cast a direct vote for this candidate
    #[error("Duplicate vote: voter {voter_id} already voted for candidate {candidate_id}")]
    DuplicateVote {
        voter_id: uuid::Uuid,
        candidate_id: uuid::Uuid,
    },

    /// Operation requires an active tournament session
    #[error("No active tournament session for voter {0}")]
    NoActiveSession(uuid::Uuid),

    /// Session row changed underneath the caller; retry with fresh state
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Tournament vote names a candidate outside the current pair
    #[error("Candidate {0} is not part of the current pair")]
    WinnerNotInPair(uuid::Uuid),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable identifier for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NOT_FOUND",
            Error::InsufficientCandidates { .. } => "INSUFFICIENT_CANDIDATES",
            Error::EmptyPool => "EMPTY_POOL",
            Error::DuplicateVote { .. } => "DUPLICATE_VOTE",
            Error::NoActiveSession(_) => "NO_ACTIVE_SESSION",
            Error::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Error::WinnerNotInPair(_) => "WINNER_NOT_IN_PAIR",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for SQLite lock contention (`SQLITE_BUSY` / "database is locked")
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                let msg = db_err.message();
                msg.contains("database is locked") || msg.contains("database table is locked")
                    || db_err.code().as_deref().map_or(false, |c| c == "5" || c == "517")
            }
            _ => false,
        }
    }

    /// True when a UNIQUE constraint rejected the write
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
