//! In-memory `DataStore` implementation backing demo mode.
//!
//! Selected at startup when no database path is configured. Data lives for
//! the lifetime of the process only.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::DataStore;
use crate::errors::AppError;
use crate::models::{
    ChoiceActivity, ChoiceSession, ChoiceSessionUpsert, EmotionLog, Letter, MatchingAttempt,
    NewEmotionLog, NewLetter, NewMatchingAttempt, NewTextResponse, NewTimelineNote, Profile,
    ScoreRow, TextResponse, TimedActivity, TimedSession, TimedSessionUpsert, TimelineNote,
    UpsertProfileRequest,
};

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, Profile>,
    text_responses: Vec<TextResponse>,
    timeline_notes: Vec<TimelineNote>,
    letters: Vec<Letter>,
    // Keyed by (activity, user_id, session_key)
    timed_sessions: HashMap<(&'static str, String, String), TimedSession>,
    choice_sessions: HashMap<(&'static str, String, String), ChoiceSession>,
    matching_attempts: Vec<MatchingAttempt>,
    emotion_logs: Vec<EmotionLog>,
    score_rows: HashMap<String, ScoreRow>,
}

/// In-memory store for demo mode and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn upsert_profile(
        &self,
        user_id: &str,
        request: &UpsertProfileRequest,
    ) -> Result<Profile, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut inner = self.inner.write().await;
        let created_at = inner
            .profiles
            .get(user_id)
            .map(|p| p.created_at.clone())
            .unwrap_or_else(|| now.clone());

        let profile = Profile {
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
        };
        inner.profiles.insert(user_id.to_string(), profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        Ok(self.inner.read().await.profiles.get(user_id).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let inner = self.inner.read().await;
        let mut profiles: Vec<Profile> = inner.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(profiles)
    }

    async fn add_text_response(
        &self,
        user_id: &str,
        request: &NewTextResponse,
    ) -> Result<TextResponse, AppError> {
        let record = TextResponse {
            id: new_id(),
            user_id: user_id.to_string(),
            prompt_key: request.prompt_key.clone(),
            text: request.text.clone(),
            created_at: Utc::now().to_rfc3339(),
        };
        self.inner.write().await.text_responses.push(record.clone());
        Ok(record)
    }

    async fn list_text_responses(&self, user_id: &str) -> Result<Vec<TextResponse>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .text_responses
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_timeline_note(
        &self,
        user_id: &str,
        request: &NewTimelineNote,
    ) -> Result<TimelineNote, AppError> {
        let record = TimelineNote {
            id: new_id(),
            user_id: user_id.to_string(),
            year: request.year,
            text: request.text.clone(),
            created_at: Utc::now().to_rfc3339(),
        };
        self.inner.write().await.timeline_notes.push(record.clone());
        Ok(record)
    }

    async fn list_timeline_notes(&self, user_id: &str) -> Result<Vec<TimelineNote>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .timeline_notes
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_letter(&self, user_id: &str, request: &NewLetter) -> Result<Letter, AppError> {
        let record = Letter {
            id: new_id(),
            user_id: user_id.to_string(),
            recipient: request.recipient.clone(),
            text: request.text.clone(),
            created_at: Utc::now().to_rfc3339(),
        };
        self.inner.write().await.letters.push(record.clone());
        Ok(record)
    }

    async fn list_letters(&self, user_id: &str) -> Result<Vec<Letter>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .letters
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_matching_attempt(
        &self,
        user_id: &str,
        request: &NewMatchingAttempt,
    ) -> Result<MatchingAttempt, AppError> {
        let record = MatchingAttempt {
            id: new_id(),
            user_id: user_id.to_string(),
            concept_key: request.concept_key.clone(),
            correct: request.correct,
            concept_completed: request.concept_completed,
            created_at: Utc::now().to_rfc3339(),
        };
        self.inner
            .write()
            .await
            .matching_attempts
            .push(record.clone());
        Ok(record)
    }

    async fn list_matching_attempts(
        &self,
        user_id: &str,
    ) -> Result<Vec<MatchingAttempt>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .matching_attempts
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_emotion_log(
        &self,
        user_id: &str,
        request: &NewEmotionLog,
    ) -> Result<EmotionLog, AppError> {
        let record = EmotionLog {
            id: new_id(),
            user_id: user_id.to_string(),
            emotion: request.emotion.clone(),
            notes: request.notes.clone(),
            created_at: Utc::now().to_rfc3339(),
        };
        self.inner.write().await.emotion_logs.push(record.clone());
        Ok(record)
    }

    async fn list_emotion_logs(&self, user_id: &str) -> Result<Vec<EmotionLog>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .emotion_logs
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_timed_session(
        &self,
        activity: TimedActivity,
        user_id: &str,
        request: &TimedSessionUpsert,
    ) -> Result<TimedSession, AppError> {
        let now = Utc::now().to_rfc3339();
        let key = (
            activity.as_str(),
            user_id.to_string(),
            request.session_key.clone(),
        );
        let mut inner = self.inner.write().await;

        let (id, prior_completed_at, created_at) = match inner.timed_sessions.get(&key) {
            Some(existing) => (
                existing.id.clone(),
                existing.completed_at.clone(),
                existing.created_at.clone(),
            ),
            None => (new_id(), None, now.clone()),
        };

        let completed_at = match (request.completed, prior_completed_at) {
            (_, Some(ts)) => Some(ts),
            (true, None) => Some(now.clone()),
            (false, None) => None,
        };

        let session = TimedSession {
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
        };
        inner.timed_sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn list_timed_sessions(
        &self,
        activity: TimedActivity,
        user_id: &str,
    ) -> Result<Vec<TimedSession>, AppError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<TimedSession> = inner
            .timed_sessions
            .iter()
            .filter(|((kind, uid, _), _)| *kind == activity.as_str() && uid == user_id)
            .map(|(_, s)| s.clone())
            .collect();
        sessions.sort_by(|a, b| a.session_key.cmp(&b.session_key));
        Ok(sessions)
    }

    async fn upsert_choice_session(
        &self,
        activity: ChoiceActivity,
        user_id: &str,
        request: &ChoiceSessionUpsert,
    ) -> Result<ChoiceSession, AppError> {
        let now = Utc::now().to_rfc3339();
        let key = (
            activity.as_str(),
            user_id.to_string(),
            request.session_key.clone(),
        );
        let mut inner = self.inner.write().await;

        let (id, created_at) = match inner.choice_sessions.get(&key) {
            Some(existing) => (existing.id.clone(), existing.created_at.clone()),
            None => (new_id(), now.clone()),
        };

        let session = ChoiceSession {
            id,
            user_id: user_id.to_string(),
            session_key: request.session_key.clone(),
            units_completed: request.units_completed,
            completed: request.completed,
            resilience_events: request.resilience_events,
            created_at,
            updated_at: now,
        };
        inner.choice_sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn list_choice_sessions(
        &self,
        activity: ChoiceActivity,
        user_id: &str,
    ) -> Result<Vec<ChoiceSession>, AppError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<ChoiceSession> = inner
            .choice_sessions
            .iter()
            .filter(|((kind, uid, _), _)| *kind == activity.as_str() && uid == user_id)
            .map(|(_, s)| s.clone())
            .collect();
        sessions.sort_by(|a, b| a.session_key.cmp(&b.session_key));
        Ok(sessions)
    }

    async fn upsert_score_row(&self, row: &ScoreRow) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .score_rows
            .insert(row.user_id.clone(), row.clone());
        Ok(())
    }

    async fn get_score_row(&self, user_id: &str) -> Result<Option<ScoreRow>, AppError> {
        Ok(self.inner.read().await.score_rows.get(user_id).cloned())
    }

    async fn list_score_rows(&self) -> Result<Vec<ScoreRow>, AppError> {
        Ok(self.inner.read().await.score_rows.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Level;

    #[tokio::test]
    async fn test_session_upsert_replaces_in_place() {
        let store = MemoryStore::new();

        let first = store
            .upsert_timed_session(
                TimedActivity::Meditation,
                "user-1",
                &TimedSessionUpsert {
                    session_key: "intro".to_string(),
                    watch_seconds: 60,
                    completed: false,
                    reflection: None,
                    view_count: 1,
                    skip_count: 0,
                },
            )
            .await
            .unwrap();

        let second = store
            .upsert_timed_session(
                TimedActivity::Meditation,
                "user-1",
                &TimedSessionUpsert {
                    session_key: "intro".to_string(),
                    watch_seconds: 300,
                    completed: true,
                    reflection: Some("calm".to_string()),
                    view_count: 2,
                    skip_count: 1,
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.completed_at.is_some());

        let sessions = store
            .list_timed_sessions(TimedActivity::Meditation, "user-1")
            .await
            .unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].watch_seconds, 300);
    }

    #[tokio::test]
    async fn test_completion_stamp_survives_later_upserts() {
        let store = MemoryStore::new();
        let upsert = |completed| TimedSessionUpsert {
            session_key: "s1".to_string(),
            watch_seconds: 120,
            completed,
            reflection: None,
            view_count: 1,
            skip_count: 0,
        };

        let done = store
            .upsert_timed_session(TimedActivity::AngerCoping, "user-1", &upsert(true))
            .await
            .unwrap();
        let stamp = done.completed_at.clone().unwrap();

        let later = store
            .upsert_timed_session(TimedActivity::AngerCoping, "user-1", &upsert(false))
            .await
            .unwrap();
        assert_eq!(later.completed_at.as_deref(), Some(stamp.as_str()));
    }

    #[tokio::test]
    async fn test_score_row_upsert_is_single_row() {
        let store = MemoryStore::new();
        for score in [100, 250] {
            store
                .upsert_score_row(&ScoreRow {
                    user_id: "user-1".to_string(),
                    score,
                    level: Level::for_score(score),
                    updated_at: Utc::now().to_rfc3339(),
                })
                .await
                .unwrap();
        }

        let rows = store.list_score_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 250);
        assert_eq!(rows[0].level, Level::Intermedio);
    }

    #[tokio::test]
    async fn test_records_scoped_by_user() {
        let store = MemoryStore::new();
        store
            .add_letter(
                "user-1",
                &NewLetter {
                    recipient: None,
                    text: "hola".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(store.list_letters("user-1").await.unwrap().len(), 1);
        assert!(store.list_letters("user-2").await.unwrap().is_empty());
    }
}
