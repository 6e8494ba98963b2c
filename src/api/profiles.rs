//! Profile API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{Profile, UpsertProfileRequest};
use crate::AppState;

/// PUT /api/profiles/:id - Create or replace a profile.
pub async fn upsert_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<UpsertProfileRequest>,
) -> ApiResult<Profile> {
    if request.display_name.trim().is_empty() {
        return Err(AppError::Validation("Display name is required".to_string()));
    }
    if let Some(age) = request.age {
        if !(0..=120).contains(&age) {
            return Err(AppError::Validation(format!("Implausible age: {}", age)));
        }
    }

    let profile = state.store.upsert_profile(&user_id, &request).await?;
    success(profile)
}

/// GET /api/profiles/:id - Get a single profile.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Profile> {
    match state.store.get_profile(&user_id).await? {
        Some(profile) => success(profile),
        None => Err(AppError::NotFound(format!(
            "Profile {} not found",
            user_id
        ))),
    }
}

/// GET /api/profiles - List all profiles.
pub async fn list_profiles(State(state): State<AppState>) -> ApiResult<Vec<Profile>> {
    let profiles = state.store.list_profiles().await?;
    success(profiles)
}
