/// Typed boundary to the remote catalog store and the metadata provider.
///
/// Transport only: no caching, no retries, no view logic. Controllers depend
/// on the narrowest seam they need, so each can be mocked on its own.
use tokio_util::sync::CancellationToken;

use crate::{
    error::AppResult,
    models::{
        BulkRefreshSummary, CatalogFilter, ContentType, EnrichedMetadata, ItemId, ItemPayload,
        ItemRecord, MetadataCandidate, Notification, RecommendationCandidate, StoredImage,
        WatchStatus,
    },
};

pub mod http;

pub use http::HttpGateway;

/// Catalog reads and mutations against the remote store
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn list_catalog(&self, filter: &CatalogFilter) -> AppResult<Vec<ItemRecord>>;

    async fn search_catalog(&self, query: &str) -> AppResult<Vec<ItemRecord>>;

    async fn create_item(&self, kind: ContentType, payload: &ItemPayload) -> AppResult<ItemRecord>;

    async fn update_item(
        &self,
        id: &ItemId,
        kind: ContentType,
        payload: &ItemPayload,
    ) -> AppResult<ItemRecord>;

    async fn delete_item(&self, id: &ItemId, kind: ContentType) -> AppResult<()>;

    /// Movie or series endpoint, chosen by `kind`. On a series this marks
    /// every season.
    async fn set_watch_status(
        &self,
        id: &ItemId,
        kind: ContentType,
        status: WatchStatus,
    ) -> AppResult<ItemRecord>;

    async fn set_season_watch_status(
        &self,
        series_id: &ItemId,
        season_number: u32,
        status: WatchStatus,
    ) -> AppResult<ItemRecord>;

    async fn add_season(&self, series_id: &ItemId) -> AppResult<ItemRecord>;

    /// Rejected by the store when only one season remains
    async fn remove_season(&self, series_id: &ItemId) -> AppResult<ItemRecord>;

    /// Syncs the season count with the external provider
    async fn refresh_series(&self, series_id: &ItemId) -> AppResult<ItemRecord>;

    async fn refresh_all_series(&self) -> AppResult<BulkRefreshSummary>;

    async fn set_priority(&self, id: &ItemId, kind: ContentType, priority: u32) -> AppResult<()>;
}

/// External metadata provider and image store
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataGateway: Send + Sync {
    /// Title search at the provider. Resolves to `AppError::Cancelled` once
    /// `cancel` fires.
    async fn search_external_metadata(
        &self,
        kind: ContentType,
        title: &str,
        cancel: CancellationToken,
    ) -> AppResult<Vec<MetadataCandidate>>;

    async fn enrich_external_metadata(
        &self,
        kind: ContentType,
        external_id: u64,
        download_image: bool,
    ) -> AppResult<EnrichedMetadata>;

    async fn download_image(&self, url: &str) -> AppResult<StoredImage>;

    async fn get_image(&self, id: &str) -> AppResult<Vec<u8>>;
}

/// Recommendations and notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeedGateway: Send + Sync {
    async fn list_recommendations(
        &self,
        added_by: Option<String>,
        count: u32,
    ) -> AppResult<Vec<RecommendationCandidate>>;

    async fn list_notifications(&self) -> AppResult<Vec<Notification>>;

    async fn dismiss_notification(&self, id: &str) -> AppResult<()>;
}

/// The full remote surface
pub trait RemoteGateway: CatalogGateway + MetadataGateway + FeedGateway {
    /// Gateway name for logging
    fn name(&self) -> &'static str;
}
