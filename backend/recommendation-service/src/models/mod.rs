use serde::{Deserialize, Serialize};

/// Which side of the binary preference signal an event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceKind {
    Like,
    Dislike,
}

impl PreferenceKind {
    /// Positive rates are likes; zero and negative rates are dislikes.
    pub fn from_rate(rate: i32) -> Self {
        if rate > 0 {
            PreferenceKind::Like
        } else {
            PreferenceKind::Dislike
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKind::Like => "like",
            PreferenceKind::Dislike => "dislike",
        }
    }
}

/// Raw ingestion record as produced by import jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceInput {
    pub collection: String,
    pub user_id: String,
    pub item_id: String,
    pub rate: i32,
}

impl PreferenceInput {
    pub fn kind(&self) -> PreferenceKind {
        PreferenceKind::from_rate(self.rate)
    }
}

/// One entry of a score-ordered ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub id: String,
    pub score: f64,
}

impl From<(String, f64)> for RankedEntry {
    fn from((id, score): (String, f64)) -> Self {
        Self { id, score }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Updated {
        neighbors_scored: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        wilson_score: Option<f64>,
    },
    Failed { reason: String },
}

/// Result of refreshing one item's similarity ranking and Wilson score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSimilarityOutcome {
    pub item_id: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemSimilarityOutcome {
    pub fn updated(
        item_id: impl Into<String>,
        neighbors_scored: usize,
        wilson_score: Option<f64>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            status: ItemStatus::Updated {
                neighbors_scored,
                wilson_score,
            },
        }
    }

    pub fn failed(item_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: ItemStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, ItemStatus::Failed { .. })
    }
}

/// Summary of one user-level recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserUpdateReport {
    pub user_id: String,
    pub neighbors_scored: usize,
    pub candidates_scored: usize,
    pub item_outcomes: Vec<ItemSimilarityOutcome>,
}

impl UserUpdateReport {
    pub fn failed_items(&self) -> impl Iterator<Item = &ItemSimilarityOutcome> {
        self.item_outcomes.iter().filter(|o| o.is_failure())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum RecomputeOutcome {
    User { report: UserUpdateReport },
    Item { outcome: ItemSimilarityOutcome },
    All { reports: Vec<UserUpdateReport> },
}
