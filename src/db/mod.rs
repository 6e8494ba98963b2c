//! Persistence module.
//!
//! `DataStore` is the single seam between the service and its storage:
//! `SqliteStore` backs normal operation, `MemoryStore` backs demo mode
//! (no database configured). The implementation is chosen once at startup.

mod memory;
mod repository;

pub use memory::MemoryStore;
pub use repository::SqliteStore;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::{
    ChoiceActivity, ChoiceSession, ChoiceSessionUpsert, EmotionLog, Letter, MatchingAttempt,
    NewEmotionLog, NewLetter, NewMatchingAttempt, NewTextResponse, NewTimelineNote, Profile,
    ScoreRow, TextResponse, TimedActivity, TimedSession, TimedSessionUpsert, TimelineNote,
    UpsertProfileRequest,
};

/// Storage operations for profiles, activity records, and score rows.
#[async_trait]
pub trait DataStore: Send + Sync {
    // Profiles
    async fn upsert_profile(
        &self,
        user_id: &str,
        request: &UpsertProfileRequest,
    ) -> Result<Profile, AppError>;
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError>;
    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError>;

    // Append-only activity records
    async fn add_text_response(
        &self,
        user_id: &str,
        request: &NewTextResponse,
    ) -> Result<TextResponse, AppError>;
    async fn list_text_responses(&self, user_id: &str) -> Result<Vec<TextResponse>, AppError>;

    async fn add_timeline_note(
        &self,
        user_id: &str,
        request: &NewTimelineNote,
    ) -> Result<TimelineNote, AppError>;
    async fn list_timeline_notes(&self, user_id: &str) -> Result<Vec<TimelineNote>, AppError>;

    async fn add_letter(&self, user_id: &str, request: &NewLetter) -> Result<Letter, AppError>;
    async fn list_letters(&self, user_id: &str) -> Result<Vec<Letter>, AppError>;

    async fn add_matching_attempt(
        &self,
        user_id: &str,
        request: &NewMatchingAttempt,
    ) -> Result<MatchingAttempt, AppError>;
    async fn list_matching_attempts(&self, user_id: &str)
        -> Result<Vec<MatchingAttempt>, AppError>;

    async fn add_emotion_log(
        &self,
        user_id: &str,
        request: &NewEmotionLog,
    ) -> Result<EmotionLog, AppError>;
    async fn list_emotion_logs(&self, user_id: &str) -> Result<Vec<EmotionLog>, AppError>;

    // Sessions, upserted per (user, session key)
    async fn upsert_timed_session(
        &self,
        activity: TimedActivity,
        user_id: &str,
        request: &TimedSessionUpsert,
    ) -> Result<TimedSession, AppError>;
    async fn list_timed_sessions(
        &self,
        activity: TimedActivity,
        user_id: &str,
    ) -> Result<Vec<TimedSession>, AppError>;

    async fn upsert_choice_session(
        &self,
        activity: ChoiceActivity,
        user_id: &str,
        request: &ChoiceSessionUpsert,
    ) -> Result<ChoiceSession, AppError>;
    async fn list_choice_sessions(
        &self,
        activity: ChoiceActivity,
        user_id: &str,
    ) -> Result<Vec<ChoiceSession>, AppError>;

    // Public score rows
    async fn upsert_score_row(&self, row: &ScoreRow) -> Result<(), AppError>;
    async fn get_score_row(&self, user_id: &str) -> Result<Option<ScoreRow>, AppError>;
    async fn list_score_rows(&self) -> Result<Vec<ScoreRow>, AppError>;
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            grade TEXT,
            school TEXT,
            city TEXT,
            country TEXT,
            age INTEGER,
            sex TEXT,
            avatar_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS text_responses (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            prompt_key TEXT NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS timeline_notes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            year INTEGER,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS letters (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            recipient TEXT,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // One table per timed activity, same shape
    for table in ["meditation_sessions", "anger_sessions"] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                session_key TEXT NOT NULL,
                watch_seconds INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                reflection TEXT,
                view_count INTEGER NOT NULL DEFAULT 1,
                skip_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(user_id, session_key)
            );
            "#
        ))
        .execute(pool)
        .await?;
    }

    // One table per choice activity, same shape
    for table in [
        "communication_sessions",
        "limit_sessions",
        "problem_sessions",
        "candy_sessions",
    ] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                session_key TEXT NOT NULL,
                units_completed INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0,
                resilience_events INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(user_id, session_key)
            );
            "#
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matching_attempts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            concept_key TEXT NOT NULL,
            correct INTEGER NOT NULL DEFAULT 0,
            concept_completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS emotion_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            emotion TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS score_rows (
            user_id TEXT PRIMARY KEY,
            score INTEGER NOT NULL,
            level TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for the per-user fan-out reads
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_text_responses_user ON text_responses(user_id);
        CREATE INDEX IF NOT EXISTS idx_timeline_notes_user ON timeline_notes(user_id);
        CREATE INDEX IF NOT EXISTS idx_letters_user ON letters(user_id);
        CREATE INDEX IF NOT EXISTS idx_matching_attempts_user ON matching_attempts(user_id);
        CREATE INDEX IF NOT EXISTS idx_emotion_logs_user ON emotion_logs(user_id);
        CREATE INDEX IF NOT EXISTS idx_score_rows_score ON score_rows(score);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
