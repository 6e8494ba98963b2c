//! Data models for the Mind Goal backend.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod activity;
mod leaderboard;
mod profile;

pub use activity::*;
pub use leaderboard::*;
pub use profile::*;
