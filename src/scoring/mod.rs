//! Score aggregation.
//!
//! `formula` holds the pure point formula over an `ActivityBundle`;
//! `calculator` fans out across the eleven data sources to build that
//! bundle, degrading softly when a source read fails.

mod calculator;
mod formula;

pub use calculator::{ScoreCalculator, ScoreOutcome};
pub use formula::{choice_session_points, compute_score, timed_session_points};
