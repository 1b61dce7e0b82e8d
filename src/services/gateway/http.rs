/// REST client for the remote catalog store.
///
/// Every endpoint lives under `{api_base_url}/api`. Non-2xx responses are
/// decoded from the store's error body into `AppError::Remote` so the
/// server's message reaches the user unchanged.
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    error::{AppError, AppResult, RemoteErrorBody},
    models::{
        BulkRefreshSummary, CatalogFilter, ContentType, EnrichedMetadata, ItemId, ItemPayload,
        ItemRecord, MetadataCandidate, Notification, RecommendationCandidate, StoredImage,
        WatchStatus,
    },
    services::gateway::{CatalogGateway, FeedGateway, MetadataGateway, RemoteGateway},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WatchStatusBody {
    watch_status: WatchStatus,
}

#[derive(Serialize)]
struct PriorityBody {
    priority: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnrichBody {
    tmdb_id: u64,
    download_image: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageDownloadBody<'a> {
    image_url: &'a str,
}

#[derive(Clone)]
pub struct HttpGateway {
    http_client: HttpClient,
    api_url: String,
}

impl HttpGateway {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            api_url: format!("{}/api", config.api_base_url.trim_end_matches('/')),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Sends the request and maps non-success statuses to `AppError::Remote`
    async fn send(&self, request: RequestBuilder) -> AppResult<Response> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, body = %body, "Remote store rejected request");
            return Err(RemoteErrorBody::into_error(status.as_u16(), &body));
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self.send(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, response = %text, "Failed to deserialize remote response");
            AppError::MalformedResponse(e.to_string())
        })
    }

    async fn send_empty(&self, request: RequestBuilder) -> AppResult<()> {
        self.send(request).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl CatalogGateway for HttpGateway {
    async fn list_catalog(&self, filter: &CatalogFilter) -> AppResult<Vec<ItemRecord>> {
        let request = self
            .http_client
            .get(self.url("/catalog"))
            .query(&filter.query_pairs());
        let items: Vec<ItemRecord> = self.send_json(request).await?;

        tracing::info!(items = items.len(), "Catalog fetched");
        Ok(items)
    }

    async fn search_catalog(&self, query: &str) -> AppResult<Vec<ItemRecord>> {
        let request = self
            .http_client
            .get(self.url("/catalog/search"))
            .query(&[("query", query)]);
        self.send_json(request).await
    }

    async fn create_item(&self, kind: ContentType, payload: &ItemPayload) -> AppResult<ItemRecord> {
        let request = self
            .http_client
            .post(self.url(&format!("/{}", kind.collection())))
            .json(payload);
        self.send_json(request).await
    }

    async fn update_item(
        &self,
        id: &ItemId,
        kind: ContentType,
        payload: &ItemPayload,
    ) -> AppResult<ItemRecord> {
        let request = self
            .http_client
            .put(self.url(&format!("/{}/{}", kind.collection(), id)))
            .json(payload);
        self.send_json(request).await
    }

    async fn delete_item(&self, id: &ItemId, kind: ContentType) -> AppResult<()> {
        let request = self
            .http_client
            .delete(self.url(&format!("/{}/{}", kind.collection(), id)));
        self.send_empty(request).await
    }

    async fn set_watch_status(
        &self,
        id: &ItemId,
        kind: ContentType,
        status: WatchStatus,
    ) -> AppResult<ItemRecord> {
        let request = self
            .http_client
            .patch(self.url(&format!("/{}/{}/watch-status", kind.collection(), id)))
            .json(&WatchStatusBody {
                watch_status: status,
            });
        self.send_json(request).await
    }

    async fn set_season_watch_status(
        &self,
        series_id: &ItemId,
        season_number: u32,
        status: WatchStatus,
    ) -> AppResult<ItemRecord> {
        let request = self
            .http_client
            .patch(self.url(&format!(
                "/series/{}/seasons/{}/watch-status",
                series_id, season_number
            )))
            .json(&WatchStatusBody {
                watch_status: status,
            });
        self.send_json(request).await
    }

    async fn add_season(&self, series_id: &ItemId) -> AppResult<ItemRecord> {
        let request = self
            .http_client
            .post(self.url(&format!("/series/{}/seasons", series_id)));
        self.send_json(request).await
    }

    async fn remove_season(&self, series_id: &ItemId) -> AppResult<ItemRecord> {
        let request = self
            .http_client
            .delete(self.url(&format!("/series/{}/seasons/last", series_id)));
        self.send_json(request).await
    }

    async fn refresh_series(&self, series_id: &ItemId) -> AppResult<ItemRecord> {
        let request = self
            .http_client
            .post(self.url(&format!("/series/{}/refresh", series_id)));
        self.send_json(request).await
    }

    async fn refresh_all_series(&self) -> AppResult<BulkRefreshSummary> {
        let request = self.http_client.post(self.url("/series/refresh-all"));
        let summary: BulkRefreshSummary = self.send_json(request).await?;

        tracing::info!(
            total = summary.total_processed,
            updated = summary.updated_count,
            failed = summary.failure_count,
            "Bulk season refresh completed"
        );
        Ok(summary)
    }

    async fn set_priority(&self, id: &ItemId, kind: ContentType, priority: u32) -> AppResult<()> {
        let request = self
            .http_client
            .patch(self.url(&format!("/{}/{}/priority", kind.collection(), id)))
            .json(&PriorityBody { priority });
        self.send_empty(request).await
    }
}

#[async_trait::async_trait]
impl MetadataGateway for HttpGateway {
    async fn search_external_metadata(
        &self,
        kind: ContentType,
        title: &str,
        cancel: CancellationToken,
    ) -> AppResult<Vec<MetadataCandidate>> {
        let path = match kind {
            ContentType::Movie => "/tmdb/search/movies",
            ContentType::Series => "/tmdb/search/series",
        };
        let request = self.http_client.get(self.url(path)).query(&[("title", title)]);

        // Dropping the request future aborts the HTTP exchange
        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = self.send_json::<Vec<MetadataCandidate>>(request) => {
                if let Ok(candidates) = &result {
                    tracing::info!(
                        query = %title,
                        kind = %kind,
                        results = candidates.len(),
                        "Metadata search completed"
                    );
                }
                result
            }
        }
    }

    async fn enrich_external_metadata(
        &self,
        kind: ContentType,
        external_id: u64,
        download_image: bool,
    ) -> AppResult<EnrichedMetadata> {
        let path = match kind {
            ContentType::Movie => "/tmdb/enrich/movie",
            ContentType::Series => "/tmdb/enrich/series",
        };
        let request = self.http_client.post(self.url(path)).json(&EnrichBody {
            tmdb_id: external_id,
            download_image,
        });
        self.send_json(request).await
    }

    async fn download_image(&self, url: &str) -> AppResult<StoredImage> {
        let request = self
            .http_client
            .post(self.url("/images/download"))
            .json(&ImageDownloadBody { image_url: url });
        self.send_json(request).await
    }

    async fn get_image(&self, id: &str) -> AppResult<Vec<u8>> {
        let request = self.http_client.get(self.url(&format!("/images/{}", id)));
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait::async_trait]
impl FeedGateway for HttpGateway {
    async fn list_recommendations(
        &self,
        added_by: Option<String>,
        count: u32,
    ) -> AppResult<Vec<RecommendationCandidate>> {
        let mut query = vec![("count", count.to_string())];
        if let Some(added_by) = added_by {
            query.push(("addedBy", added_by));
        }
        let request = self
            .http_client
            .get(self.url("/recommendations"))
            .query(&query);
        self.send_json(request).await
    }

    async fn list_notifications(&self) -> AppResult<Vec<Notification>> {
        let request = self.http_client.get(self.url("/notifications"));
        self.send_json(request).await
    }

    async fn dismiss_notification(&self, id: &str) -> AppResult<()> {
        let request = self
            .http_client
            .delete(self.url(&format!("/notifications/{}", id)));
        self.send_empty(request).await
    }
}

impl RemoteGateway for HttpGateway {
    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_gateway(base: &str) -> HttpGateway {
        let config = Config {
            api_base_url: base.to_string(),
            ..Config::default()
        };
        HttpGateway::new(&config).unwrap()
    }

    #[test]
    fn test_url_joins_api_prefix() {
        let gateway = create_test_gateway("http://localhost:8080/");
        assert_eq!(
            gateway.url("/series/abc/refresh"),
            "http://localhost:8080/api/series/abc/refresh"
        );
    }

    #[test]
    fn test_watch_status_body_format() {
        let body = serde_json::to_string(&WatchStatusBody {
            watch_status: WatchStatus::Watched,
        })
        .unwrap();
        assert_eq!(body, r#"{"watchStatus":"WATCHED"}"#);
    }

    #[test]
    fn test_enrich_body_format() {
        let body = serde_json::to_string(&EnrichBody {
            tmdb_id: 27205,
            download_image: true,
        })
        .unwrap();
        assert_eq!(body, r#"{"tmdbId":27205,"downloadImage":true}"#);
    }

    #[tokio::test]
    async fn test_cancelled_search_short_circuits() {
        // Unroutable address: the request would hang or fail, but the token
        // is already cancelled so the select resolves first.
        let gateway = create_test_gateway("http://10.255.255.1:9");
        let token = CancellationToken::new();
        token.cancel();

        let result = gateway
            .search_external_metadata(ContentType::Movie, "Inception", token)
            .await;
        assert!(matches!(result, Err(AppError::Cancelled)));
    }
}
