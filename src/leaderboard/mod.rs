//! Leaderboard publishing and reading.
//!
//! The public score row is a materialized cache of the pure score function;
//! publishing is an idempotent upsert keyed by user id. The ranked view is
//! recomputed on every read from the score rows joined with profiles.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::db::DataStore;
use crate::errors::AppError;
use crate::models::{LeaderboardEntry, Level, Profile, ScoreRow};
use crate::scoring::ScoreCalculator;

/// Publisher and reader over the shared score-row table.
pub struct Leaderboard {
    store: Arc<dyn DataStore>,
}

impl Leaderboard {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Upsert the public score row for a user, deriving the level and
    /// stamping the current time. Republishing the same score only moves
    /// the timestamp.
    pub async fn publish(&self, user_id: &str, score: i64) -> Result<ScoreRow, AppError> {
        let row = ScoreRow {
            user_id: user_id.to_string(),
            score,
            level: Level::for_score(score),
            updated_at: Utc::now().to_rfc3339(),
        };
        self.store.upsert_score_row(&row).await?;
        tracing::debug!("Published score {} for {}", score, user_id);
        Ok(row)
    }

    /// Recompute and republish every profile's score in one pass.
    ///
    /// Returns the number of rows refreshed.
    pub async fn recompute_all(&self, calculator: &ScoreCalculator) -> Result<usize, AppError> {
        let profiles = self.store.list_profiles().await?;
        let mut refreshed = 0;
        for profile in &profiles {
            let outcome = calculator.score_for(&profile.id).await;
            self.publish(&profile.id, outcome.score).await?;
            refreshed += 1;
        }
        tracing::info!("Leaderboard recomputed for {} users", refreshed);
        Ok(refreshed)
    }

    /// All score rows joined with profile display fields, ranked.
    pub async fn list(&self) -> Result<Vec<LeaderboardEntry>, AppError> {
        let rows = self.store.list_score_rows().await?;
        let profiles = self.store.list_profiles().await?;
        Ok(rank_entries(rows, &profiles))
    }

    /// The rank of one user's entry, `None` if unpublished.
    pub async fn position_of(&self, user_id: &str) -> Result<Option<i64>, AppError> {
        let entries = self.list().await?;
        Ok(entries
            .iter()
            .find(|e| e.user_id == user_id)
            .map(|e| e.position))
    }
}

/// Order score rows and assign competition ranks.
///
/// Ordering is (score desc, updated_at asc, user_id asc): an earlier
/// publish ranks higher on ties, and the user id makes the order total.
/// The rank itself is shared by tied scores, i.e. always
/// `1 + count(rows with strictly greater score)`.
pub fn rank_entries(mut rows: Vec<ScoreRow>, profiles: &[Profile]) -> Vec<LeaderboardEntry> {
    let by_id: HashMap<&str, &Profile> = profiles.iter().map(|p| (p.id.as_str(), p)).collect();

    rows.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.updated_at.cmp(&b.updated_at))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    let mut entries = Vec::with_capacity(rows.len());
    let mut rank = 0;
    let mut prev_score = None;
    for (index, row) in rows.into_iter().enumerate() {
        if prev_score != Some(row.score) {
            rank = index as i64 + 1;
            prev_score = Some(row.score);
        }
        let profile = by_id.get(row.user_id.as_str());
        entries.push(LeaderboardEntry {
            position: rank,
            display_name: profile
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| row.user_id.clone()),
            avatar_url: profile.and_then(|p| p.avatar_url.clone()),
            user_id: row.user_id,
            score: row.score,
            level: row.level,
            updated_at: row.updated_at,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: &str, score: i64, updated_at: &str) -> ScoreRow {
        ScoreRow {
            user_id: user_id.to_string(),
            score,
            level: Level::for_score(score),
            updated_at: updated_at.to_string(),
        }
    }

    fn profile(id: &str, name: &str) -> Profile {
        Profile {
            id: id.to_string(),
            display_name: name.to_string(),
            grade: None,
            school: None,
            city: None,
            country: None,
            age: None,
            sex: None,
            avatar_url: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_sorted_descending_by_score() {
        let entries = rank_entries(
            vec![
                row("a", 100, "2026-01-01T00:00:00+00:00"),
                row("b", 300, "2026-01-01T00:00:00+00:00"),
                row("c", 200, "2026-01-01T00:00:00+00:00"),
            ],
            &[],
        );
        let order: Vec<&str> = entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, ["b", "c", "a"]);
        let positions: Vec<i64> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, [1, 2, 3]);
    }

    #[test]
    fn test_ties_share_rank_and_break_on_earlier_publish() {
        let entries = rank_entries(
            vec![
                row("late", 200, "2026-01-02T00:00:00+00:00"),
                row("early", 200, "2026-01-01T00:00:00+00:00"),
                row("low", 100, "2026-01-01T00:00:00+00:00"),
            ],
            &[],
        );
        assert_eq!(entries[0].user_id, "early");
        assert_eq!(entries[1].user_id, "late");
        // Competition ranks: both tied entries are rank 1, next is 3
        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[1].position, 1);
        assert_eq!(entries[2].position, 3);
    }

    #[test]
    fn test_rank_equals_one_plus_strictly_greater_count() {
        let rows = vec![
            row("a", 500, "t1"),
            row("b", 500, "t2"),
            row("c", 300, "t1"),
            row("d", 300, "t2"),
            row("e", 100, "t1"),
        ];
        let entries = rank_entries(rows.clone(), &[]);
        for entry in &entries {
            let greater = rows.iter().filter(|r| r.score > entry.score).count() as i64;
            assert_eq!(entry.position, greater + 1);
        }
    }

    #[test]
    fn test_joins_profile_display_fields() {
        let entries = rank_entries(
            vec![row("u1", 50, "t"), row("ghost", 40, "t")],
            &[profile("u1", "Ana")],
        );
        assert_eq!(entries[0].display_name, "Ana");
        // Missing profile falls back to the raw user id
        assert_eq!(entries[1].display_name, "ghost");
    }

    #[test]
    fn test_empty_rows_empty_board() {
        assert!(rank_entries(Vec::new(), &[]).is_empty());
    }
}
