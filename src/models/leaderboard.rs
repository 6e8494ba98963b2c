//! Public score row and leaderboard models.

use serde::{Deserialize, Serialize};

/// Coarse skill level derived from the score via fixed thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Level {
    Principiante,
    Intermedio,
    Avanzado,
    Experto,
    Maestro,
}

impl Level {
    /// Level thresholds, lower-bound inclusive.
    pub fn for_score(score: i64) -> Self {
        if score < 200 {
            Level::Principiante
        } else if score < 500 {
            Level::Intermedio
        } else if score < 1000 {
            Level::Avanzado
        } else if score < 2000 {
            Level::Experto
        } else {
            Level::Maestro
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Principiante => "Principiante",
            Level::Intermedio => "Intermedio",
            Level::Avanzado => "Avanzado",
            Level::Experto => "Experto",
            Level::Maestro => "Maestro",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Principiante" => Some(Level::Principiante),
            "Intermedio" => Some(Level::Intermedio),
            "Avanzado" => Some(Level::Avanzado),
            "Experto" => Some(Level::Experto),
            "Maestro" => Some(Level::Maestro),
            _ => None,
        }
    }
}

/// The persisted public score row: a materialized cache of the pure score
/// function over the user's activity records, never a source of truth.
/// At most one row per user (upsert on the user id).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRow {
    pub user_id: String,
    pub score: i64,
    pub level: Level,
    pub updated_at: String,
}

/// One ranked leaderboard entry: a score row joined with profile display
/// fields. Not persisted; recomputed on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based competition rank: tied scores share a rank.
    pub position: i64,
    pub user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub score: i64,
    pub level: Level,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(Level::for_score(0), Level::Principiante);
        assert_eq!(Level::for_score(199), Level::Principiante);
        assert_eq!(Level::for_score(200), Level::Intermedio);
        assert_eq!(Level::for_score(499), Level::Intermedio);
        assert_eq!(Level::for_score(500), Level::Avanzado);
        assert_eq!(Level::for_score(999), Level::Avanzado);
        assert_eq!(Level::for_score(1000), Level::Experto);
        assert_eq!(Level::for_score(1999), Level::Experto);
        assert_eq!(Level::for_score(2000), Level::Maestro);
        assert_eq!(Level::for_score(100_000), Level::Maestro);
    }

    #[test]
    fn test_level_round_trip() {
        for level in [
            Level::Principiante,
            Level::Intermedio,
            Level::Avanzado,
            Level::Experto,
            Level::Maestro,
        ] {
            assert_eq!(Level::from_str(level.as_str()), Some(level));
        }
        assert_eq!(Level::from_str("Legendario"), None);
    }
}
