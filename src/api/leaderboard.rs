//! Leaderboard API endpoints.

use axum::extract::{Path, State};
use serde::Serialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::LeaderboardEntry;
use crate::AppState;

/// GET /api/leaderboard - Ranked entries, best score first.
pub async fn list_leaderboard(State(state): State<AppState>) -> ApiResult<Vec<LeaderboardEntry>> {
    let entries = state.leaderboard.list().await?;
    success(entries)
}

/// Position payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    pub user_id: String,
    pub position: i64,
}

/// GET /api/leaderboard/:id/position - One user's rank.
pub async fn get_position(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<PositionResponse> {
    match state.leaderboard.position_of(&user_id).await? {
        Some(position) => success(PositionResponse { user_id, position }),
        None => Err(AppError::NotFound(format!(
            "No published score for {}",
            user_id
        ))),
    }
}

/// Batch refresh result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeResponse {
    pub refreshed: usize,
}

/// POST /api/leaderboard/recompute - Refresh every user's score row.
pub async fn recompute_leaderboard(State(state): State<AppState>) -> ApiResult<RecomputeResponse> {
    let refreshed = state.leaderboard.recompute_all(&state.calculator).await?;
    success(RecomputeResponse { refreshed })
}
