use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{ContentType, CoverImage, EnrichedMetadata, ItemId, WatchStatus};
use crate::error::{AppError, AppResult};

/// Per-season watch record owned by a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub season_number: u32,
    #[serde(default)]
    pub watch_status: WatchStatus,
}

impl Season {
    pub fn unwatched(season_number: u32) -> Self {
        Self {
            season_number,
            watch_status: WatchStatus::Unwatched,
        }
    }
}

/// Catalog record exactly as the remote store returns it.
///
/// Movie and series endpoints omit `contentType`; the catalog endpoints
/// include it. Everything else is optional on the wire as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: ItemId,
    pub content_type: Option<ContentType>,
    pub title: String,
    pub cover_image: Option<String>,
    pub link: Option<String>,
    pub link_description: Option<String>,
    pub comment: Option<String>,
    pub added_by: Option<String>,
    pub genres: Option<Vec<String>>,
    pub priority: Option<i32>,
    /// Movie runtime in minutes
    pub length: Option<u32>,
    #[serde(alias = "seriesWatchStatus")]
    pub watch_status: Option<WatchStatus>,
    pub date_added: Option<NaiveDateTime>,
    pub seasons: Option<Vec<Season>>,
    pub has_new_seasons: Option<bool>,
    pub total_available_seasons: Option<u32>,
    pub series_status: Option<String>,
}

/// A tracked movie or series as held in the client view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ItemId,
    pub content_type: ContentType,
    pub title: String,
    pub cover_image: Option<CoverImage>,
    pub link: Option<String>,
    pub link_description: Option<String>,
    pub comment: Option<String>,
    pub added_by: Option<String>,
    pub genres: Vec<String>,
    pub priority: u32,
    pub length: Option<u32>,
    /// Movies: stored status. Series: the server's roll-up, adopted verbatim.
    pub watch_status: WatchStatus,
    pub date_added: Option<NaiveDateTime>,
    pub seasons: Vec<Season>,
    pub has_new_seasons: bool,
    pub total_available_seasons: Option<u32>,
    pub series_status: Option<String>,
}

impl CatalogItem {
    /// Converts a wire record into a view item.
    ///
    /// `fallback` supplies the content type when the record omits it, which
    /// is the case for every movie/series endpoint response.
    pub fn from_record(record: ItemRecord, fallback: Option<ContentType>) -> AppResult<Self> {
        let content_type = record.content_type.or(fallback).ok_or_else(|| {
            AppError::MalformedResponse(format!("item {} has no content type", record.id))
        })?;

        let mut seasons = record.seasons.unwrap_or_default();
        seasons.sort_by_key(|s| s.season_number);

        Ok(Self {
            id: record.id,
            content_type,
            title: record.title,
            cover_image: record.cover_image.as_deref().and_then(CoverImage::parse),
            link: non_blank(record.link),
            link_description: non_blank(record.link_description),
            comment: non_blank(record.comment),
            added_by: non_blank(record.added_by),
            genres: normalize_genres(record.genres.unwrap_or_default()),
            priority: record.priority.unwrap_or(0).max(0) as u32,
            length: record.length,
            watch_status: record.watch_status.unwrap_or_default(),
            date_added: record.date_added,
            seasons,
            has_new_seasons: record.has_new_seasons.unwrap_or(false),
            total_available_seasons: record.total_available_seasons,
            series_status: record.series_status,
        })
    }

    pub fn is_series(&self) -> bool {
        self.content_type == ContentType::Series
    }

    pub fn season(&self, season_number: u32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.season_number == season_number)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Trims genres, drops blank entries and removes duplicates, keeping the
/// first occurrence of each.
pub fn normalize_genres<I, S>(genres: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for genre in genres {
        let genre = genre.as_ref().trim();
        if genre.is_empty() || normalized.iter().any(|g| g == genre) {
            continue;
        }
        normalized.push(genre.to_string());
    }
    normalized
}

/// Server-side catalog filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub watch_status: Option<WatchStatus>,
    pub added_by: Option<String>,
}

impl CatalogFilter {
    pub fn is_unfiltered(&self) -> bool {
        self.watch_status.is_none() && self.added_by.is_none()
    }

    /// Query-string pairs for the catalog endpoint
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.watch_status {
            pairs.push(("watchStatus", status.as_str().to_string()));
        }
        if let Some(added_by) = &self.added_by {
            pairs.push(("addedBy", added_by.clone()));
        }
        pairs
    }
}

/// Result of the bulk "check all series for new seasons" job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRefreshSummary {
    #[serde(default)]
    pub total_processed: u32,
    #[serde(default)]
    pub updated_count: u32,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(default)]
    pub success_count: Option<u32>,
}

/// Editable fields of a movie or series, used for create and update
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub content_type: ContentType,
    pub title: String,
    pub cover_image: Option<String>,
    pub link: Option<String>,
    pub link_description: Option<String>,
    pub comment: Option<String>,
    pub added_by: Option<String>,
    pub genres: Vec<String>,
    pub priority: u32,
    /// Runtime in minutes; movies only
    pub length: Option<u32>,
    /// Number of seasons to create; series only, ignored on update
    pub season_count: Option<u32>,
}

/// Request body for the movie and series endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub title: String,
    pub cover_image: Option<String>,
    pub link: Option<String>,
    pub comment: Option<String>,
    pub added_by: Option<String>,
    pub genres: Option<Vec<String>>,
    pub priority: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasons: Option<Vec<Season>>,
}

impl ItemDraft {
    pub fn new(content_type: ContentType, title: impl Into<String>) -> Self {
        Self {
            content_type,
            title: title.into(),
            cover_image: None,
            link: None,
            link_description: None,
            comment: None,
            added_by: None,
            genres: Vec::new(),
            priority: 0,
            length: None,
            season_count: None,
        }
    }

    /// Draft prefilled from an existing item, for editing
    pub fn from_item(item: &CatalogItem) -> Self {
        Self {
            content_type: item.content_type,
            title: item.title.clone(),
            cover_image: item.cover_image.as_ref().map(|c| c.raw().to_string()),
            link: item.link.clone(),
            link_description: item.link_description.clone(),
            comment: item.comment.clone(),
            added_by: item.added_by.clone(),
            genres: item.genres.clone(),
            priority: item.priority,
            length: item.length,
            season_count: None,
        }
    }

    pub fn validate(&self, creating: bool) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title is required".to_string()));
        }
        if creating
            && self.content_type == ContentType::Series
            && self.season_count.unwrap_or(0) == 0
        {
            return Err(AppError::InvalidInput(
                "Number of seasons must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Fills the draft from provider metadata picked in the search popup
    pub fn apply_enrichment(&mut self, metadata: &EnrichedMetadata) {
        if let Some(title) = metadata.title.as_deref().filter(|t| !t.trim().is_empty()) {
            self.title = title.trim().to_string();
        }
        let genres = normalize_genres(&metadata.genres);
        if !genres.is_empty() {
            self.genres = genres;
        }
        if self.content_type == ContentType::Movie {
            if let Some(length) = metadata.length.filter(|n| *n > 0) {
                self.length = Some(length);
            }
        }
        if self.content_type == ContentType::Series {
            if let Some(total) = metadata.total_seasons.filter(|n| *n > 0) {
                self.season_count = Some(total);
            }
        }
        if let Some(image_id) = metadata.saved_image_id.as_deref().filter(|id| !id.is_empty()) {
            self.cover_image = Some(image_id.to_string());
        } else if self.cover_image.is_none() {
            self.cover_image = metadata.poster_url.clone();
        }
    }

    /// Body for create (`creating`) or update requests.
    ///
    /// Seasons are only sent on create, numbered 1..N and unwatched; updates
    /// leave the stored seasons alone. Runtime and link description belong
    /// to movies; the server overwrites both on every movie update.
    pub fn payload(&self, creating: bool) -> ItemPayload {
        let genres = normalize_genres(&self.genres);
        let seasons = match (creating, self.content_type, self.season_count) {
            (true, ContentType::Series, Some(count)) => {
                Some((1..=count).map(Season::unwatched).collect())
            }
            _ => None,
        };

        let movie = self.content_type == ContentType::Movie;

        ItemPayload {
            title: self.title.trim().to_string(),
            cover_image: trimmed(&self.cover_image),
            link: trimmed(&self.link),
            comment: trimmed(&self.comment),
            added_by: trimmed(&self.added_by),
            genres: if genres.is_empty() { None } else { Some(genres) },
            priority: self.priority,
            link_description: trimmed(&self.link_description).filter(|_| movie),
            length: self.length.filter(|_| movie),
            seasons,
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
