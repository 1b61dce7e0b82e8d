use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{ContentType, ItemId};

/// "New seasons available" notice created by the remote refresh job.
///
/// Holds a back-reference to its series only; the series may be deleted
/// while the notification is still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub series_id: ItemId,
    pub series_title: String,
    pub message: String,
    pub new_seasons_count: u32,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

/// Read-only recommendation projection, recomputed on every fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationCandidate {
    pub id: ItemId,
    pub title: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
    /// Null for movies
    #[serde(default)]
    pub has_new_seasons: Option<bool>,
}

impl RecommendationCandidate {
    pub fn has_new_seasons(&self) -> bool {
        self.has_new_seasons.unwrap_or(false)
    }

    /// Star count for display, capped at five
    pub fn stars(&self) -> u32 {
        self.priority.unwrap_or(0).min(5)
    }
}
