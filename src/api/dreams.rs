//! Dream roadmap and suggestion endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::ai::{DreamSuggestion, Roadmap};
use crate::errors::AppError;
use crate::AppState;

/// Request body for roadmap generation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapRequest {
    pub dream_title: String,
    #[serde(default)]
    pub dream_description: String,
}

/// POST /api/users/:id/roadmap - Generate a roadmap toward a dream.
pub async fn generate_roadmap(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RoadmapRequest>,
) -> ApiResult<Roadmap> {
    if request.dream_title.trim().is_empty() {
        return Err(AppError::Validation("Dream title is required".to_string()));
    }

    let profile = state
        .store
        .get_profile(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

    let roadmap = state
        .ai
        .generate_roadmap(&profile, &request.dream_title, &request.dream_description)
        .await?;
    success(roadmap)
}

/// Query parameters for dream suggestions.
#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub grade: Option<String>,
}

/// GET /api/dreams/suggestions - Dream ideas; defaults when AI is down.
pub async fn dream_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionQuery>,
) -> ApiResult<Vec<DreamSuggestion>> {
    let suggestions = state
        .ai
        .dream_suggestions(params.age, params.grade.as_deref())
        .await;
    success(suggestions)
}
