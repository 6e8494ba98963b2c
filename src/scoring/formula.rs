//! The point formula.
//!
//! One pure function from an `ActivityBundle` to an integer score. All
//! weights live here as named constants; no other module does point
//! arithmetic.

use std::collections::HashSet;

use crate::models::{
    ActivityBundle, ChoiceActivity, ChoiceSession, EmotionLog, MatchingAttempt, TimedSession,
};

/// Points per full minute watched in a timed session.
pub const MINUTE_POINTS: i64 = 50;
/// Flat bonus for a completed timed session.
pub const COMPLETION_BONUS: i64 = 200;
/// Points per replay beyond the first view.
pub const REPLAY_POINTS: i64 = 100;
/// Skips beyond this count start costing points.
pub const SKIP_THRESHOLD: i64 = 5;
/// Penalty per skip over the threshold.
pub const SKIP_PENALTY: i64 = 10;

/// Points per completed unit in a choice session.
pub const UNIT_POINTS: i64 = 30;
/// Flat bonus for a completed choice session.
pub const SESSION_BONUS: i64 = 150;

/// Points per matching-game attempt.
pub const ATTEMPT_POINTS: i64 = 10;
/// Extra points per correct match.
pub const MATCH_POINTS: i64 = 30;
/// Bonus per distinct concept completed.
pub const CONCEPT_POINTS: i64 = 100;

/// Flat points per emotion-log entry.
pub const EMOTION_ENTRY_POINTS: i64 = 50;

impl ChoiceActivity {
    /// Weight of one resilience event, per activity outcome taxonomy.
    pub fn resilience_weight(&self) -> i64 {
        match self {
            ChoiceActivity::Communication => 20,
            ChoiceActivity::LimitSetting => 20,
            ChoiceActivity::ProblemSolving => 25,
            ChoiceActivity::CandyStory => 40,
        }
    }
}

fn char_points(text: &str) -> i64 {
    text.chars().count() as i64
}

/// Points for one timed session (meditation and anger-coping share this).
///
/// The subtotal saturates at zero so a heavily skipped session never drags
/// other records' contributions down.
pub fn timed_session_points(session: &TimedSession) -> i64 {
    let mut points = (session.watch_seconds / 60) * MINUTE_POINTS;
    if session.completed_at.is_some() {
        points += COMPLETION_BONUS;
    }
    if let Some(reflection) = &session.reflection {
        points += char_points(reflection);
    }
    if session.view_count > 1 {
        points += (session.view_count - 1) * REPLAY_POINTS;
    }
    if session.skip_count > SKIP_THRESHOLD {
        points -= (session.skip_count - SKIP_THRESHOLD) * SKIP_PENALTY;
    }
    points.max(0)
}

/// Points for one choice session of the given activity.
pub fn choice_session_points(session: &ChoiceSession, activity: ChoiceActivity) -> i64 {
    let mut points = session.units_completed * UNIT_POINTS;
    if session.completed {
        points += SESSION_BONUS;
    }
    points + session.resilience_events * activity.resilience_weight()
}

fn matching_points(attempts: &[MatchingAttempt]) -> i64 {
    let mut points = 0;
    let mut completed_concepts: HashSet<&str> = HashSet::new();
    for attempt in attempts {
        points += ATTEMPT_POINTS;
        if attempt.correct {
            points += MATCH_POINTS;
        }
        if attempt.concept_completed {
            completed_concepts.insert(attempt.concept_key.as_str());
        }
    }
    points + completed_concepts.len() as i64 * CONCEPT_POINTS
}

fn emotion_log_points(entry: &EmotionLog) -> i64 {
    EMOTION_ENTRY_POINTS + entry.notes.as_deref().map_or(0, char_points)
}

/// Total score for a user's activity records.
///
/// Deterministic given the bundle; no randomness, no hidden state.
pub fn compute_score(bundle: &ActivityBundle) -> i64 {
    let mut score = 0;

    for response in &bundle.responses {
        score += char_points(&response.text);
    }
    for note in &bundle.timeline_notes {
        score += char_points(&note.text);
    }
    for letter in &bundle.letters {
        score += char_points(&letter.text);
    }

    for session in &bundle.meditation_sessions {
        score += timed_session_points(session);
    }
    for session in &bundle.anger_sessions {
        score += timed_session_points(session);
    }

    for session in &bundle.communication_sessions {
        score += choice_session_points(session, ChoiceActivity::Communication);
    }
    for session in &bundle.limit_sessions {
        score += choice_session_points(session, ChoiceActivity::LimitSetting);
    }
    for session in &bundle.problem_sessions {
        score += choice_session_points(session, ChoiceActivity::ProblemSolving);
    }
    for session in &bundle.candy_sessions {
        score += choice_session_points(session, ChoiceActivity::CandyStory);
    }

    score += matching_points(&bundle.matching_attempts);

    for entry in &bundle.emotion_logs {
        score += emotion_log_points(entry);
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextResponse;

    fn timed(watch: i64, completed: bool, reflection: Option<&str>, views: i64, skips: i64) -> TimedSession {
        TimedSession {
            id: "s".to_string(),
            user_id: "u".to_string(),
            session_key: "k".to_string(),
            watch_seconds: watch,
            completed_at: completed.then(|| "2026-01-01T00:00:00+00:00".to_string()),
            reflection: reflection.map(str::to_string),
            view_count: views,
            skip_count: skips,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn response(text: &str) -> TextResponse {
        TextResponse {
            id: "r".to_string(),
            user_id: "u".to_string(),
            prompt_key: "p".to_string(),
            text: text.to_string(),
            created_at: String::new(),
        }
    }

    fn attempt(concept: &str, correct: bool, done: bool) -> MatchingAttempt {
        MatchingAttempt {
            id: "m".to_string(),
            user_id: "u".to_string(),
            concept_key: concept.to_string(),
            correct,
            concept_completed: done,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_empty_bundle_scores_zero() {
        assert_eq!(compute_score(&ActivityBundle::default()), 0);
    }

    #[test]
    fn test_reference_scenario() {
        // 42-char response + meditation(180s watched, completed, no
        // reflection, single view, no skips) = 42 + 3*50 + 200 = 392
        let bundle = ActivityBundle {
            responses: vec![response(&"x".repeat(42))],
            meditation_sessions: vec![timed(180, true, None, 1, 0)],
            ..Default::default()
        };
        assert_eq!(compute_score(&bundle), 392);
    }

    #[test]
    fn test_text_length_is_monotonic() {
        let short = ActivityBundle {
            responses: vec![response("hola")],
            ..Default::default()
        };
        let long = ActivityBundle {
            responses: vec![response("hola mundo")],
            ..Default::default()
        };
        assert!(compute_score(&long) > compute_score(&short));
    }

    #[test]
    fn test_char_count_not_byte_count() {
        let bundle = ActivityBundle {
            responses: vec![response("niño")],
            ..Default::default()
        };
        assert_eq!(compute_score(&bundle), 4);
    }

    #[test]
    fn test_timed_session_terms() {
        // Partial minutes are floored
        assert_eq!(timed_session_points(&timed(119, false, None, 1, 0)), 50);
        // Completion bonus
        assert_eq!(timed_session_points(&timed(0, true, None, 1, 0)), 200);
        // Reflection counts characters
        assert_eq!(timed_session_points(&timed(0, false, Some("bien"), 1, 0)), 4);
        // Replays beyond the first view
        assert_eq!(timed_session_points(&timed(0, false, None, 3, 0)), 200);
    }

    #[test]
    fn test_skip_penalty_beyond_threshold() {
        let base = timed_session_points(&timed(600, false, None, 1, 0));
        // At the threshold nothing is deducted
        assert_eq!(timed_session_points(&timed(600, false, None, 1, 5)), base);
        assert_eq!(
            timed_session_points(&timed(600, false, None, 1, 8)),
            base - 30
        );
        // Monotonically non-increasing in skip count
        let mut prev = base;
        for skips in 0..20 {
            let points = timed_session_points(&timed(600, false, None, 1, skips));
            assert!(points <= prev);
            prev = points;
        }
    }

    #[test]
    fn test_timed_session_floors_at_zero() {
        // One watched minute, 100 skips: the penalty would go deep negative
        assert_eq!(timed_session_points(&timed(60, false, None, 1, 100)), 0);
    }

    #[test]
    fn test_choice_session_weights() {
        let session = ChoiceSession {
            id: "c".to_string(),
            user_id: "u".to_string(),
            session_key: "k".to_string(),
            units_completed: 2,
            completed: true,
            resilience_events: 3,
            created_at: String::new(),
            updated_at: String::new(),
        };
        // 2*30 + 150 + 3*w
        assert_eq!(
            choice_session_points(&session, ChoiceActivity::Communication),
            270
        );
        assert_eq!(
            choice_session_points(&session, ChoiceActivity::ProblemSolving),
            285
        );
        assert_eq!(
            choice_session_points(&session, ChoiceActivity::CandyStory),
            330
        );
    }

    #[test]
    fn test_matching_counts_distinct_completed_concepts() {
        let bundle = ActivityBundle {
            matching_attempts: vec![
                attempt("joy", false, false),
                attempt("joy", true, true),
                attempt("joy", true, true),
                attempt("fear", true, true),
            ],
            ..Default::default()
        };
        // 4*10 + 3*30 + 2 distinct concepts * 100
        assert_eq!(compute_score(&bundle), 330);
    }

    #[test]
    fn test_emotion_log_points() {
        let bundle = ActivityBundle {
            emotion_logs: vec![
                EmotionLog {
                    id: "e1".to_string(),
                    user_id: "u".to_string(),
                    emotion: "alegre".to_string(),
                    notes: None,
                    created_at: String::new(),
                },
                EmotionLog {
                    id: "e2".to_string(),
                    user_id: "u".to_string(),
                    emotion: "triste".to_string(),
                    notes: Some("mal día".to_string()),
                    created_at: String::new(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(compute_score(&bundle), 50 + 50 + 7);
    }

    #[test]
    fn test_score_never_negative() {
        let bundle = ActivityBundle {
            meditation_sessions: vec![timed(0, false, None, 1, 1000)],
            anger_sessions: vec![timed(0, false, None, 1, 1000)],
            ..Default::default()
        };
        assert_eq!(compute_score(&bundle), 0);
    }
}
