use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod catalog;
pub mod metadata;
pub mod notification;

pub use catalog::{
    normalize_genres, BulkRefreshSummary, CatalogFilter, CatalogItem, ItemDraft, ItemPayload,
    ItemRecord, Season,
};
pub use metadata::{CoverImage, EnrichedMetadata, MetadataCandidate, StoredImage};
pub use notification::{Notification, RecommendationCandidate};

/// Identifier assigned by the remote store to a catalog item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        ItemId(id)
    }
}

/// Kind of catalog entry. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Movie,
    Series,
}

impl ContentType {
    /// Path segment of the remote collection holding this kind
    pub fn collection(self) -> &'static str {
        match self {
            ContentType::Movie => "movies",
            ContentType::Series => "series",
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Movie => write!(f, "movie"),
            ContentType::Series => write!(f, "series"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchStatus {
    Watched,
    #[default]
    Unwatched,
}

impl WatchStatus {
    pub fn toggled(self) -> Self {
        match self {
            WatchStatus::Watched => WatchStatus::Unwatched,
            WatchStatus::Unwatched => WatchStatus::Watched,
        }
    }

    /// Wire spelling, as used in query strings
    pub fn as_str(self) -> &'static str {
        match self {
            WatchStatus::Watched => "WATCHED",
            WatchStatus::Unwatched => "UNWATCHED",
        }
    }
}
