//! Activity record models.
//!
//! Eleven record variants, one per feature of the frontend. Free-text
//! records are append-only; sessions are upserted per (user, session key).

use serde::{Deserialize, Serialize};

/// A free-text reflection answer to a guided prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextResponse {
    pub id: String,
    pub user_id: String,
    pub prompt_key: String,
    pub text: String,
    pub created_at: String,
}

/// Request body for appending a text response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTextResponse {
    pub prompt_key: String,
    pub text: String,
}

/// A note attached to a year on the personal timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineNote {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    pub text: String,
    pub created_at: String,
}

/// Request body for appending a timeline note.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimelineNote {
    #[serde(default)]
    pub year: Option<i64>,
    pub text: String,
}

/// A letter written during the letter-to-self / letter-to-other activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Letter {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub text: String,
    pub created_at: String,
}

/// Request body for appending a letter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLetter {
    #[serde(default)]
    pub recipient: Option<String>,
    pub text: String,
}

/// The two timed-session activities (guided video/audio with watch tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedActivity {
    Meditation,
    AngerCoping,
}

impl TimedActivity {
    pub const ALL: [TimedActivity; 2] = [TimedActivity::Meditation, TimedActivity::AngerCoping];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimedActivity::Meditation => "meditation",
            TimedActivity::AngerCoping => "anger",
        }
    }
}

/// A timed session record (meditation or anger-coping).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedSession {
    pub id: String,
    pub user_id: String,
    pub session_key: String,
    pub watch_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
    pub view_count: i64,
    pub skip_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for upserting a timed session.
///
/// `completed` marks the session finished; the server stamps the completion
/// time once and preserves it across later upserts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedSessionUpsert {
    pub session_key: String,
    #[serde(default)]
    pub watch_seconds: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub reflection: Option<String>,
    #[serde(default = "default_view_count")]
    pub view_count: i64,
    #[serde(default)]
    pub skip_count: i64,
}

fn default_view_count() -> i64 {
    1
}

/// The four choice-based activities (structured scenarios with outcomes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceActivity {
    Communication,
    LimitSetting,
    ProblemSolving,
    CandyStory,
}

impl ChoiceActivity {
    pub const ALL: [ChoiceActivity; 4] = [
        ChoiceActivity::Communication,
        ChoiceActivity::LimitSetting,
        ChoiceActivity::ProblemSolving,
        ChoiceActivity::CandyStory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChoiceActivity::Communication => "communication",
            ChoiceActivity::LimitSetting => "limits",
            ChoiceActivity::ProblemSolving => "problems",
            ChoiceActivity::CandyStory => "candy",
        }
    }
}

/// A choice-based session record.
///
/// `resilience_events` counts the activity-specific positive outcome:
/// I-messages used, firm boundaries held, constructive strategies chosen,
/// or temptations resisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceSession {
    pub id: String,
    pub user_id: String,
    pub session_key: String,
    pub units_completed: i64,
    pub completed: bool,
    pub resilience_events: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for upserting a choice session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceSessionUpsert {
    pub session_key: String,
    #[serde(default)]
    pub units_completed: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub resilience_events: i64,
}

/// One attempt in the emotion-matching game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingAttempt {
    pub id: String,
    pub user_id: String,
    pub concept_key: String,
    pub correct: bool,
    pub concept_completed: bool,
    pub created_at: String,
}

/// Request body for appending a matching attempt.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMatchingAttempt {
    pub concept_key: String,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub concept_completed: bool,
}

/// An entry in the emotion diary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionLog {
    pub id: String,
    pub user_id: String,
    pub emotion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
}

/// Request body for appending an emotion log entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmotionLog {
    pub emotion: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Every activity record of one user, grouped by source.
///
/// This is the input to the score formula and the payload of the
/// activities endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBundle {
    pub responses: Vec<TextResponse>,
    pub timeline_notes: Vec<TimelineNote>,
    pub letters: Vec<Letter>,
    pub meditation_sessions: Vec<TimedSession>,
    pub anger_sessions: Vec<TimedSession>,
    pub communication_sessions: Vec<ChoiceSession>,
    pub limit_sessions: Vec<ChoiceSession>,
    pub problem_sessions: Vec<ChoiceSession>,
    pub candy_sessions: Vec<ChoiceSession>,
    pub matching_attempts: Vec<MatchingAttempt>,
    pub emotion_logs: Vec<EmotionLog>,
}
