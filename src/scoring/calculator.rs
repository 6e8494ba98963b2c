//! Score calculator: fan-out over the eleven activity sources.

use std::sync::Arc;

use crate::db::DataStore;
use crate::errors::AppError;
use crate::models::{ActivityBundle, ChoiceActivity, Level, TimedActivity};
use crate::scoring::compute_score;

/// Result of one score computation.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub score: i64,
    pub level: Level,
    /// True when at least one source read failed and contributed nothing,
    /// so the score may undercount.
    pub partial: bool,
}

/// Computes a user's score by reading every activity source.
///
/// Source reads happen sequentially; a failed read is logged and treated
/// as an empty source, never aborting the whole computation.
pub struct ScoreCalculator {
    store: Arc<dyn DataStore>,
}

impl ScoreCalculator {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Fetch all activity records for a user, with per-source soft-fail.
    ///
    /// Returns the bundle and whether any source was skipped.
    pub async fn bundle_for(&self, user_id: &str) -> (ActivityBundle, bool) {
        let mut partial = false;

        let bundle = ActivityBundle {
            responses: soft(
                "text_responses",
                self.store.list_text_responses(user_id).await,
                &mut partial,
            ),
            timeline_notes: soft(
                "timeline_notes",
                self.store.list_timeline_notes(user_id).await,
                &mut partial,
            ),
            letters: soft("letters", self.store.list_letters(user_id).await, &mut partial),
            meditation_sessions: soft(
                "meditation_sessions",
                self.store
                    .list_timed_sessions(TimedActivity::Meditation, user_id)
                    .await,
                &mut partial,
            ),
            anger_sessions: soft(
                "anger_sessions",
                self.store
                    .list_timed_sessions(TimedActivity::AngerCoping, user_id)
                    .await,
                &mut partial,
            ),
            communication_sessions: soft(
                "communication_sessions",
                self.store
                    .list_choice_sessions(ChoiceActivity::Communication, user_id)
                    .await,
                &mut partial,
            ),
            limit_sessions: soft(
                "limit_sessions",
                self.store
                    .list_choice_sessions(ChoiceActivity::LimitSetting, user_id)
                    .await,
                &mut partial,
            ),
            problem_sessions: soft(
                "problem_sessions",
                self.store
                    .list_choice_sessions(ChoiceActivity::ProblemSolving, user_id)
                    .await,
                &mut partial,
            ),
            candy_sessions: soft(
                "candy_sessions",
                self.store
                    .list_choice_sessions(ChoiceActivity::CandyStory, user_id)
                    .await,
                &mut partial,
            ),
            matching_attempts: soft(
                "matching_attempts",
                self.store.list_matching_attempts(user_id).await,
                &mut partial,
            ),
            emotion_logs: soft(
                "emotion_logs",
                self.store.list_emotion_logs(user_id).await,
                &mut partial,
            ),
        };

        (bundle, partial)
    }

    /// Compute the current score for a user.
    pub async fn score_for(&self, user_id: &str) -> ScoreOutcome {
        let (bundle, partial) = self.bundle_for(user_id).await;
        let score = compute_score(&bundle);
        ScoreOutcome {
            score,
            level: Level::for_score(score),
            partial,
        }
    }
}

/// Silent-degradation policy: a failed source contributes nothing.
fn soft<T>(source: &str, result: Result<Vec<T>, AppError>, partial: &mut bool) -> Vec<T> {
    match result {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!("Scoring without {}: read failed: {}", source, err);
            *partial = true;
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::db::MemoryStore;
    use crate::models::{
        ChoiceSession, ChoiceSessionUpsert, EmotionLog, Letter, MatchingAttempt, NewEmotionLog,
        NewLetter, NewMatchingAttempt, NewTextResponse, NewTimelineNote, Profile, ScoreRow,
        TextResponse, TimedSession, TimedSessionUpsert, TimelineNote, UpsertProfileRequest,
    };

    /// Delegates to a `MemoryStore` but fails every letters read.
    struct BrokenLettersStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl DataStore for BrokenLettersStore {
        async fn upsert_profile(
            &self,
            user_id: &str,
            request: &UpsertProfileRequest,
        ) -> Result<Profile, AppError> {
            self.inner.upsert_profile(user_id, request).await
        }
        async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
            self.inner.get_profile(user_id).await
        }
        async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
            self.inner.list_profiles().await
        }
        async fn add_text_response(
            &self,
            user_id: &str,
            request: &NewTextResponse,
        ) -> Result<TextResponse, AppError> {
            self.inner.add_text_response(user_id, request).await
        }
        async fn list_text_responses(
            &self,
            user_id: &str,
        ) -> Result<Vec<TextResponse>, AppError> {
            self.inner.list_text_responses(user_id).await
        }
        async fn add_timeline_note(
            &self,
            user_id: &str,
            request: &NewTimelineNote,
        ) -> Result<TimelineNote, AppError> {
            self.inner.add_timeline_note(user_id, request).await
        }
        async fn list_timeline_notes(
            &self,
            user_id: &str,
        ) -> Result<Vec<TimelineNote>, AppError> {
            self.inner.list_timeline_notes(user_id).await
        }
        async fn add_letter(
            &self,
            user_id: &str,
            request: &NewLetter,
        ) -> Result<Letter, AppError> {
            self.inner.add_letter(user_id, request).await
        }
        async fn list_letters(&self, _user_id: &str) -> Result<Vec<Letter>, AppError> {
            Err(AppError::Database("letters table unreachable".to_string()))
        }
        async fn add_matching_attempt(
            &self,
            user_id: &str,
            request: &NewMatchingAttempt,
        ) -> Result<MatchingAttempt, AppError> {
            self.inner.add_matching_attempt(user_id, request).await
        }
        async fn list_matching_attempts(
            &self,
            user_id: &str,
        ) -> Result<Vec<MatchingAttempt>, AppError> {
            self.inner.list_matching_attempts(user_id).await
        }
        async fn add_emotion_log(
            &self,
            user_id: &str,
            request: &NewEmotionLog,
        ) -> Result<EmotionLog, AppError> {
            self.inner.add_emotion_log(user_id, request).await
        }
        async fn list_emotion_logs(&self, user_id: &str) -> Result<Vec<EmotionLog>, AppError> {
            self.inner.list_emotion_logs(user_id).await
        }
        async fn upsert_timed_session(
            &self,
            activity: TimedActivity,
            user_id: &str,
            request: &TimedSessionUpsert,
        ) -> Result<TimedSession, AppError> {
            self.inner.upsert_timed_session(activity, user_id, request).await
        }
        async fn list_timed_sessions(
            &self,
            activity: TimedActivity,
            user_id: &str,
        ) -> Result<Vec<TimedSession>, AppError> {
            self.inner.list_timed_sessions(activity, user_id).await
        }
        async fn upsert_choice_session(
            &self,
            activity: ChoiceActivity,
            user_id: &str,
            request: &ChoiceSessionUpsert,
        ) -> Result<ChoiceSession, AppError> {
            self.inner.upsert_choice_session(activity, user_id, request).await
        }
        async fn list_choice_sessions(
            &self,
            activity: ChoiceActivity,
            user_id: &str,
        ) -> Result<Vec<ChoiceSession>, AppError> {
            self.inner.list_choice_sessions(activity, user_id).await
        }
        async fn upsert_score_row(&self, row: &ScoreRow) -> Result<(), AppError> {
            self.inner.upsert_score_row(row).await
        }
        async fn get_score_row(&self, user_id: &str) -> Result<Option<ScoreRow>, AppError> {
            self.inner.get_score_row(user_id).await
        }
        async fn list_score_rows(&self) -> Result<Vec<ScoreRow>, AppError> {
            self.inner.list_score_rows().await
        }
    }

    #[tokio::test]
    async fn test_zero_records_scores_zero() {
        let calc = ScoreCalculator::new(Arc::new(MemoryStore::new()));
        let outcome = calc.score_for("nobody").await;
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.level, Level::Principiante);
        assert!(!outcome.partial);
    }

    #[tokio::test]
    async fn test_failed_source_degrades_softly() {
        let store = BrokenLettersStore {
            inner: MemoryStore::new(),
        };
        // A letter that would never be counted
        store
            .add_letter(
                "user-1",
                &NewLetter {
                    recipient: None,
                    text: "querido yo".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .add_text_response(
                "user-1",
                &NewTextResponse {
                    prompt_key: "p1".to_string(),
                    text: "x".repeat(42),
                },
            )
            .await
            .unwrap();

        let calc = ScoreCalculator::new(Arc::new(store));
        let outcome = calc.score_for("user-1").await;

        // The other ten sources still count; the call does not error.
        assert_eq!(outcome.score, 42);
        assert!(outcome.partial);
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_text_response(
                "user-1",
                &NewTextResponse {
                    prompt_key: "dream".to_string(),
                    text: "x".repeat(42),
                },
            )
            .await
            .unwrap();
        store
            .upsert_timed_session(
                TimedActivity::Meditation,
                "user-1",
                &TimedSessionUpsert {
                    session_key: "intro".to_string(),
                    watch_seconds: 180,
                    completed: true,
                    reflection: None,
                    view_count: 1,
                    skip_count: 0,
                },
            )
            .await
            .unwrap();

        let calc = ScoreCalculator::new(store);
        let outcome = calc.score_for("user-1").await;
        assert_eq!(outcome.score, 392);
        assert_eq!(outcome.level, Level::Intermedio);
        assert!(!outcome.partial);
    }
}
