//! SQLite-backed `DataStore` implementation.
//!
//! Uses prepared statements with `ON CONFLICT` upserts for the per-user
//! session and score tables.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::DataStore;
use crate::errors::AppError;
use crate::models::{
    ChoiceActivity, ChoiceSession, ChoiceSessionUpsert, EmotionLog, Letter, Level,
    MatchingAttempt, NewEmotionLog, NewLetter, NewMatchingAttempt, NewTextResponse,
    NewTimelineNote, Profile, ScoreRow, TextResponse, TimedActivity, TimedSession,
    TimedSessionUpsert, TimelineNote, UpsertProfileRequest,
};

/// SQLite repository for all data operations.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn timed_table(activity: TimedActivity) -> &'static str {
    match activity {
        TimedActivity::Meditation => "meditation_sessions",
        TimedActivity::AngerCoping => "anger_sessions",
    }
}

fn choice_table(activity: ChoiceActivity) -> &'static str {
    match activity {
        ChoiceActivity::Communication => "communication_sessions",
        ChoiceActivity::LimitSetting => "limit_sessions",
        ChoiceActivity::ProblemSolving => "problem_sessions",
        ChoiceActivity::CandyStory => "candy_sessions",
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    // ==================== PROFILE OPERATIONS ====================

    async fn upsert_profile(
        &self,
        user_id: &str,
        request: &UpsertProfileRequest,
    ) -> Result<Profile, AppError> {
        let now = Utc::now().to_rfc3339();
        let created_at = self
            .get_profile(user_id)
            .await?
            .map(|p| p.created_at)
            .unwrap_or_else(|| now.clone());

        sqlx::query(
            r#"INSERT INTO profiles (id, display_name, grade, school, city, country, age, sex, avatar_url, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   display_name = excluded.display_name,
                   grade = excluded.grade,
                   school = excluded.school,
                   city = excluded.city,
                   country = excluded.country,
                   age = excluded.age,
                   sex = excluded.sex,
                   avatar_url = excluded.avatar_url,
                   updated_at = excluded.updated_at"#,
        )
        .bind(user_id)
        .bind(&request.display_name)
        .bind(&request.grade)
        .bind(&request.school)
        .bind(&request.city)
        .bind(&request.country)
        .bind(request.age)
        .bind(&request.sex)
        .bind(&request.avatar_url)
        .bind(&created_at)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Profile {
            id: user_id.to_string(),
            display_name: request.display_name.clone(),
            grade: request.grade.clone(),
            school: request.school.clone(),
            city: request.city.clone(),
            country: request.country.clone(),
            age: request.age,
            sex: request.sex.clone(),
            avatar_url: request.avatar_url.clone(),
            created_at,
            updated_at: now,
        })
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query(
            "SELECT id, display_name, grade, school, city, country, age, sex, avatar_url, created_at, updated_at FROM profiles WHERE id = ?"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let rows = sqlx::query(
            "SELECT id, display_name, grade, school, city, country, age, sex, avatar_url, created_at, updated_at FROM profiles ORDER BY display_name"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(profile_from_row).collect())
    }

    // ==================== APPEND-ONLY RECORDS ====================

    async fn add_text_response(
        &self,
        user_id: &str,
        request: &NewTextResponse,
    ) -> Result<TextResponse, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO text_responses (id, user_id, prompt_key, text, created_at) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(user_id)
        .bind(&request.prompt_key)
        .bind(&request.text)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(TextResponse {
            id,
            user_id: user_id.to_string(),
            prompt_key: request.prompt_key.clone(),
            text: request.text.clone(),
            created_at: now,
        })
    }

    async fn list_text_responses(&self, user_id: &str) -> Result<Vec<TextResponse>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, prompt_key, text, created_at FROM text_responses WHERE user_id = ? ORDER BY created_at"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TextResponse {
                id: row.get("id"),
                user_id: row.get("user_id"),
                prompt_key: row.get("prompt_key"),
                text: row.get("text"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn add_timeline_note(
        &self,
        user_id: &str,
        request: &NewTimelineNote,
    ) -> Result<TimelineNote, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO timeline_notes (id, user_id, year, text, created_at) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(user_id)
        .bind(request.year)
        .bind(&request.text)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(TimelineNote {
            id,
            user_id: user_id.to_string(),
            year: request.year,
            text: request.text.clone(),
            created_at: now,
        })
    }

    async fn list_timeline_notes(&self, user_id: &str) -> Result<Vec<TimelineNote>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, year, text, created_at FROM timeline_notes WHERE user_id = ? ORDER BY created_at"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TimelineNote {
                id: row.get("id"),
                user_id: row.get("user_id"),
                year: row.get("year"),
                text: row.get("text"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn add_letter(&self, user_id: &str, request: &NewLetter) -> Result<Letter, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO letters (id, user_id, recipient, text, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(&request.recipient)
        .bind(&request.text)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Letter {
            id,
            user_id: user_id.to_string(),
            recipient: request.recipient.clone(),
            text: request.text.clone(),
            created_at: now,
        })
    }

    async fn list_letters(&self, user_id: &str) -> Result<Vec<Letter>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, recipient, text, created_at FROM letters WHERE user_id = ? ORDER BY created_at"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Letter {
                id: row.get("id"),
                user_id: row.get("user_id"),
                recipient: row.get("recipient"),
                text: row.get("text"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn add_matching_attempt(
        &self,
        user_id: &str,
        request: &NewMatchingAttempt,
    ) -> Result<MatchingAttempt, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO matching_attempts (id, user_id, concept_key, correct, concept_completed, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(user_id)
        .bind(&request.concept_key)
        .bind(request.correct as i32)
        .bind(request.concept_completed as i32)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(MatchingAttempt {
            id,
            user_id: user_id.to_string(),
            concept_key: request.concept_key.clone(),
            correct: request.correct,
            concept_completed: request.concept_completed,
            created_at: now,
        })
    }

    async fn list_matching_attempts(
        &self,
        user_id: &str,
    ) -> Result<Vec<MatchingAttempt>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, concept_key, correct, concept_completed, created_at FROM matching_attempts WHERE user_id = ? ORDER BY created_at"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let correct: i32 = row.get("correct");
                let concept_completed: i32 = row.get("concept_completed");
                MatchingAttempt {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    concept_key: row.get("concept_key"),
                    correct: correct != 0,
                    concept_completed: concept_completed != 0,
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }

    async fn add_emotion_log(
        &self,
        user_id: &str,
        request: &NewEmotionLog,
    ) -> Result<EmotionLog, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO emotion_logs (id, user_id, emotion, notes, created_at) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(user_id)
        .bind(&request.emotion)
        .bind(&request.notes)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(EmotionLog {
            id,
            user_id: user_id.to_string(),
            emotion: request.emotion.clone(),
            notes: request.notes.clone(),
            created_at: now,
        })
    }

    async fn list_emotion_logs(&self, user_id: &str) -> Result<Vec<EmotionLog>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, emotion, notes, created_at FROM emotion_logs WHERE user_id = ? ORDER BY created_at"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EmotionLog {
                id: row.get("id"),
                user_id: row.get("user_id"),
                emotion: row.get("emotion"),
                notes: row.get("notes"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    // ==================== SESSION UPSERTS ====================

    async fn upsert_timed_session(
        &self,
        activity: TimedActivity,
        user_id: &str,
        request: &TimedSessionUpsert,
    ) -> Result<TimedSession, AppError> {
        let table = timed_table(activity);
        let now = Utc::now().to_rfc3339();

        let existing = sqlx::query(&format!(
            "SELECT id, completed_at, created_at FROM {table} WHERE user_id = ? AND session_key = ?"
        ))
        .bind(user_id)
        .bind(&request.session_key)
        .fetch_optional(&self.pool)
        .await?;

        let (id, prior_completed_at, created_at) = match &existing {
            Some(row) => (
                row.get::<String, _>("id"),
                row.get::<Option<String>, _>("completed_at"),
                row.get::<String, _>("created_at"),
            ),
            None => (uuid::Uuid::new_v4().to_string(), None, now.clone()),
        };

        // The completion stamp is set once and survives later upserts.
        let completed_at = match (request.completed, prior_completed_at) {
            (_, Some(ts)) => Some(ts),
            (true, None) => Some(now.clone()),
            (false, None) => None,
        };

        sqlx::query(&format!(
            r#"INSERT INTO {table} (id, user_id, session_key, watch_seconds, completed_at, reflection, view_count, skip_count, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(user_id, session_key) DO UPDATE SET
                   watch_seconds = excluded.watch_seconds,
                   completed_at = excluded.completed_at,
                   reflection = excluded.reflection,
                   view_count = excluded.view_count,
                   skip_count = excluded.skip_count,
                   updated_at = excluded.updated_at"#
        ))
        .bind(&id)
        .bind(user_id)
        .bind(&request.session_key)
        .bind(request.watch_seconds)
        .bind(&completed_at)
        .bind(&request.reflection)
        .bind(request.view_count)
        .bind(request.skip_count)
        .bind(&created_at)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(TimedSession {
            id,
            user_id: user_id.to_string(),
            session_key: request.session_key.clone(),
            watch_seconds: request.watch_seconds,
            completed_at,
            reflection: request.reflection.clone(),
            view_count: request.view_count,
            skip_count: request.skip_count,
            created_at,
            updated_at: now,
        })
    }

    async fn list_timed_sessions(
        &self,
        activity: TimedActivity,
        user_id: &str,
    ) -> Result<Vec<TimedSession>, AppError> {
        let table = timed_table(activity);
        let rows = sqlx::query(&format!(
            "SELECT id, user_id, session_key, watch_seconds, completed_at, reflection, view_count, skip_count, created_at, updated_at FROM {table} WHERE user_id = ? ORDER BY session_key"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TimedSession {
                id: row.get("id"),
                user_id: row.get("user_id"),
                session_key: row.get("session_key"),
                watch_seconds: row.get("watch_seconds"),
                completed_at: row.get("completed_at"),
                reflection: row.get("reflection"),
                view_count: row.get("view_count"),
                skip_count: row.get("skip_count"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    async fn upsert_choice_session(
        &self,
        activity: ChoiceActivity,
        user_id: &str,
        request: &ChoiceSessionUpsert,
    ) -> Result<ChoiceSession, AppError> {
        let table = choice_table(activity);
        let now = Utc::now().to_rfc3339();

        let existing = sqlx::query(&format!(
            "SELECT id, created_at FROM {table} WHERE user_id = ? AND session_key = ?"
        ))
        .bind(user_id)
        .bind(&request.session_key)
        .fetch_optional(&self.pool)
        .await?;

        let (id, created_at) = match &existing {
            Some(row) => (
                row.get::<String, _>("id"),
                row.get::<String, _>("created_at"),
            ),
            None => (uuid::Uuid::new_v4().to_string(), now.clone()),
        };

        sqlx::query(&format!(
            r#"INSERT INTO {table} (id, user_id, session_key, units_completed, completed, resilience_events, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(user_id, session_key) DO UPDATE SET
                   units_completed = excluded.units_completed,
                   completed = excluded.completed,
                   resilience_events = excluded.resilience_events,
                   updated_at = excluded.updated_at"#
        ))
        .bind(&id)
        .bind(user_id)
        .bind(&request.session_key)
        .bind(request.units_completed)
        .bind(request.completed as i32)
        .bind(request.resilience_events)
        .bind(&created_at)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(ChoiceSession {
            id,
            user_id: user_id.to_string(),
            session_key: request.session_key.clone(),
            units_completed: request.units_completed,
            completed: request.completed,
            resilience_events: request.resilience_events,
            created_at,
            updated_at: now,
        })
    }

    async fn list_choice_sessions(
        &self,
        activity: ChoiceActivity,
        user_id: &str,
    ) -> Result<Vec<ChoiceSession>, AppError> {
        let table = choice_table(activity);
        let rows = sqlx::query(&format!(
            "SELECT id, user_id, session_key, units_completed, completed, resilience_events, created_at, updated_at FROM {table} WHERE user_id = ? ORDER BY session_key"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let completed: i32 = row.get("completed");
                ChoiceSession {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    session_key: row.get("session_key"),
                    units_completed: row.get("units_completed"),
                    completed: completed != 0,
                    resilience_events: row.get("resilience_events"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                }
            })
            .collect())
    }

    // ==================== SCORE ROWS ====================

    async fn upsert_score_row(&self, row: &ScoreRow) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO score_rows (user_id, score, level, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                   score = excluded.score,
                   level = excluded.level,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&row.user_id)
        .bind(row.score)
        .bind(row.level.as_str())
        .bind(&row.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_score_row(&self, user_id: &str) -> Result<Option<ScoreRow>, AppError> {
        let row = sqlx::query(
            "SELECT user_id, score, level, updated_at FROM score_rows WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(score_row_from_row))
    }

    async fn list_score_rows(&self) -> Result<Vec<ScoreRow>, AppError> {
        let rows =
            sqlx::query("SELECT user_id, score, level, updated_at FROM score_rows").fetch_all(&self.pool).await?;

        Ok(rows.iter().map(score_row_from_row).collect())
    }
}

// Helper functions for row conversion

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> Profile {
    Profile {
        id: row.get("id"),
        display_name: row.get("display_name"),
        grade: row.get("grade"),
        school: row.get("school"),
        city: row.get("city"),
        country: row.get("country"),
        age: row.get("age"),
        sex: row.get("sex"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn score_row_from_row(row: &sqlx::sqlite::SqliteRow) -> ScoreRow {
    let level_str: String = row.get("level");
    let score: i64 = row.get("score");
    ScoreRow {
        user_id: row.get("user_id"),
        score,
        // Fall back to recomputing from the score if the label is unknown
        level: Level::from_str(&level_str).unwrap_or_else(|| Level::for_score(score)),
        updated_at: row.get("updated_at"),
    }
}
