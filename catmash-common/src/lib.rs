//! # CatMash Common Library
//!
//! Shared code for the CatMash service:
//! - Error taxonomy with stable identifiers
//! - Database models, schema creation and migrations
//! - Configuration loading
//! - Time and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use db::models::{
    Candidate, Principal, Role, TournamentSession, Vote, VoteMode, VoteWithCandidate,
};
pub use error::{Error, Result};
