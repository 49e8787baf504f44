//! HTTP API handlers

pub mod auth;
pub mod cats;
pub mod health;
pub mod tournament;
pub mod votes;

pub use auth::{AdminVoter, CurrentVoter};
pub use cats::cat_routes;
pub use health::health_routes;
pub use tournament::tournament_routes;
pub use votes::vote_routes;
