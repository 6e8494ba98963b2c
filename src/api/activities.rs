//! Activity record API endpoints.
//!
//! One append endpoint per free-text/game source, one upsert endpoint per
//! session source, and a combined read of the full bundle.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    ActivityBundle, ChoiceActivity, ChoiceSession, ChoiceSessionUpsert, EmotionLog, Letter,
    MatchingAttempt, NewEmotionLog, NewLetter, NewMatchingAttempt, NewTextResponse,
    NewTimelineNote, TextResponse, TimedActivity, TimedSession, TimedSessionUpsert, TimelineNote,
};
use crate::AppState;

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// POST /api/users/:id/responses - Append a free-text response.
pub async fn add_text_response(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<NewTextResponse>,
) -> ApiResult<TextResponse> {
    require_text("Prompt key", &request.prompt_key)?;
    require_text("Text", &request.text)?;

    let record = state.store.add_text_response(&user_id, &request).await?;
    success(record)
}

/// POST /api/users/:id/timeline - Append a timeline note.
pub async fn add_timeline_note(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<NewTimelineNote>,
) -> ApiResult<TimelineNote> {
    require_text("Text", &request.text)?;

    let record = state.store.add_timeline_note(&user_id, &request).await?;
    success(record)
}

/// POST /api/users/:id/letters - Append a letter.
pub async fn add_letter(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<NewLetter>,
) -> ApiResult<Letter> {
    require_text("Text", &request.text)?;

    let record = state.store.add_letter(&user_id, &request).await?;
    success(record)
}

/// POST /api/users/:id/matching - Append a matching-game attempt.
pub async fn add_matching_attempt(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<NewMatchingAttempt>,
) -> ApiResult<MatchingAttempt> {
    require_text("Concept key", &request.concept_key)?;

    let record = state.store.add_matching_attempt(&user_id, &request).await?;
    success(record)
}

/// POST /api/users/:id/emotions - Append an emotion log entry.
pub async fn add_emotion_log(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<NewEmotionLog>,
) -> ApiResult<EmotionLog> {
    require_text("Emotion", &request.emotion)?;

    let record = state.store.add_emotion_log(&user_id, &request).await?;
    success(record)
}

fn validate_timed(request: &TimedSessionUpsert) -> Result<(), AppError> {
    require_text("Session key", &request.session_key)?;
    if request.watch_seconds < 0 || request.view_count < 1 || request.skip_count < 0 {
        return Err(AppError::Validation(
            "Session counters must be non-negative".to_string(),
        ));
    }
    Ok(())
}

async fn upsert_timed(
    state: AppState,
    activity: TimedActivity,
    user_id: String,
    request: TimedSessionUpsert,
) -> ApiResult<TimedSession> {
    validate_timed(&request)?;
    let session = state
        .store
        .upsert_timed_session(activity, &user_id, &request)
        .await?;
    success(session)
}

/// PUT /api/users/:id/meditation - Upsert a meditation session.
pub async fn upsert_meditation_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<TimedSessionUpsert>,
) -> ApiResult<TimedSession> {
    upsert_timed(state, TimedActivity::Meditation, user_id, request).await
}

/// PUT /api/users/:id/anger - Upsert an anger-coping session.
pub async fn upsert_anger_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<TimedSessionUpsert>,
) -> ApiResult<TimedSession> {
    upsert_timed(state, TimedActivity::AngerCoping, user_id, request).await
}

fn validate_choice(request: &ChoiceSessionUpsert) -> Result<(), AppError> {
    require_text("Session key", &request.session_key)?;
    if request.units_completed < 0 || request.resilience_events < 0 {
        return Err(AppError::Validation(
            "Session counters must be non-negative".to_string(),
        ));
    }
    Ok(())
}

async fn upsert_choice(
    state: AppState,
    activity: ChoiceActivity,
    user_id: String,
    request: ChoiceSessionUpsert,
) -> ApiResult<ChoiceSession> {
    validate_choice(&request)?;
    let session = state
        .store
        .upsert_choice_session(activity, &user_id, &request)
        .await?;
    success(session)
}

/// PUT /api/users/:id/communication - Upsert a communication-practice session.
pub async fn upsert_communication_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ChoiceSessionUpsert>,
) -> ApiResult<ChoiceSession> {
    upsert_choice(state, ChoiceActivity::Communication, user_id, request).await
}

/// PUT /api/users/:id/limits - Upsert a limit-setting session.
pub async fn upsert_limit_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ChoiceSessionUpsert>,
) -> ApiResult<ChoiceSession> {
    upsert_choice(state, ChoiceActivity::LimitSetting, user_id, request).await
}

/// PUT /api/users/:id/problems - Upsert a problem-solving session.
pub async fn upsert_problem_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ChoiceSessionUpsert>,
) -> ApiResult<ChoiceSession> {
    upsert_choice(state, ChoiceActivity::ProblemSolving, user_id, request).await
}

/// PUT /api/users/:id/candy - Upsert a candy-story session.
pub async fn upsert_candy_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ChoiceSessionUpsert>,
) -> ApiResult<ChoiceSession> {
    upsert_choice(state, ChoiceActivity::CandyStory, user_id, request).await
}

/// GET /api/users/:id/activities - All activity records for a user.
pub async fn get_activity_bundle(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ActivityBundle> {
    let (bundle, _) = state.calculator.bundle_for(&user_id).await;
    success(bundle)
}
