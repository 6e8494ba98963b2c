//! Score API endpoints.

use axum::extract::{Path, State};
use serde::Serialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{Level, ScoreRow};
use crate::AppState;

/// Recomputation result returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub user_id: String,
    pub score: i64,
    pub level: Level,
    /// True when a source read failed and the score may undercount.
    pub partial: bool,
    pub updated_at: String,
}

/// POST /api/users/:id/score - Recompute the score and publish it.
pub async fn recompute_score(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ScoreResponse> {
    let outcome = state.calculator.score_for(&user_id).await;
    let row = state.leaderboard.publish(&user_id, outcome.score).await?;

    success(ScoreResponse {
        user_id,
        score: row.score,
        level: row.level,
        partial: outcome.partial,
        updated_at: row.updated_at,
    })
}

/// GET /api/users/:id/score - The published score row.
pub async fn get_score(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ScoreRow> {
    match state.store.get_score_row(&user_id).await? {
        Some(row) => success(row),
        None => Err(AppError::NotFound(format!(
            "No published score for {}",
            user_id
        ))),
    }
}
