use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{CatalogFilter, CatalogItem, ItemRecord},
    services::{aggregate::contributors, gateway::CatalogGateway},
    state::{AppState, ItemView, NoticeLevel},
};

enum LoadSource {
    Filter(CatalogFilter),
    Search(String),
}

/// Loads the catalog into the shared state.
///
/// Each load takes a generation number; a load that finishes after a newer
/// one started is dropped without touching state.
#[derive(Clone)]
pub struct CatalogLoader {
    gateway: Arc<dyn CatalogGateway>,
    state: AppState,
    generation: Arc<AtomicU64>,
}

impl CatalogLoader {
    pub fn new(gateway: Arc<dyn CatalogGateway>, state: AppState) -> Self {
        Self {
            gateway,
            state,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Full reload with the active filter
    pub async fn reload(&self) -> AppResult<()> {
        let filter = self.state.inner.read().await.filter.clone();
        self.load(LoadSource::Filter(filter)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_filter(&self, filter: CatalogFilter) -> AppResult<()> {
        self.state.inner.write().await.filter = filter.clone();
        self.load(LoadSource::Filter(filter)).await
    }

    /// Remote catalog search; a blank query falls back to a plain reload
    pub async fn search(&self, query: &str) -> AppResult<()> {
        let query = query.trim();
        if query.is_empty() {
            return self.reload().await;
        }
        self.load(LoadSource::Search(query.to_string())).await
    }

    async fn load(&self, source: LoadSource) -> AppResult<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.inner.write().await.loading = true;

        let unfiltered = matches!(&source, LoadSource::Filter(f) if f.is_unfiltered());
        let result = match &source {
            LoadSource::Filter(filter) => self.gateway.list_catalog(filter).await,
            LoadSource::Search(query) => self.gateway.search_catalog(query).await,
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Discarding superseded catalog load");
            return Ok(());
        }

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load catalog");
                let mut state = self.state.inner.write().await;
                state.loading = false;
                state.push_notice(NoticeLevel::Error, "Failed to load catalog.");
                return Err(e);
            }
        };

        let items = into_items(records);
        let needs_contributors = {
            let mut state = self.state.inner.write().await;
            let pending: HashMap<_, _> = state
                .catalog
                .iter()
                .filter_map(|view| view.pending.map(|op| (view.item.id.clone(), op)))
                .collect();

            let inner = &mut *state;
            inner.catalog = items
                .into_iter()
                .map(|item| {
                    let mut view = ItemView::new(item);
                    view.pending = pending.get(&view.item.id).copied();
                    // Unconfirmed priority nudges sit on top of the stored value
                    if let Some(lane) = inner.priorities.get_mut(&view.item.id) {
                        lane.base = view.item.priority;
                        view.item.priority = lane.local();
                    }
                    view
                })
                .collect();
            state.loading = false;

            if unfiltered {
                state.contributors = Some(contributors(state.catalog.iter().map(|v| &v.item)));
            }
            tracing::info!(items = state.catalog.len(), generation, "Catalog loaded");
            state.contributors.is_none()
        };

        if needs_contributors {
            self.load_contributors().await;
        }
        Ok(())
    }

    /// One-off unfiltered fetch so filter tabs exist before the first
    /// unfiltered load
    async fn load_contributors(&self) {
        match self.gateway.list_catalog(&CatalogFilter::default()).await {
            Ok(records) => {
                let items = into_items(records);
                let mut state = self.state.inner.write().await;
                if state.contributors.is_none() {
                    state.contributors = Some(contributors(&items));
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load contributor list"),
        }
    }
}

fn into_items(records: Vec<ItemRecord>) -> Vec<CatalogItem> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            CatalogItem::from_record(record, None)
                .map_err(|e| tracing::warn!(item_id = %id, error = %e, "Skipping catalog record"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{ContentType, ItemId, WatchStatus};
    use crate::services::gateway::MockCatalogGateway;
    use crate::state::{PriorityDelta, PriorityLane};
    use mockall::predicate::*;
    use tokio_test::{assert_err, assert_ok};

    fn record(id: &str, added_by: &str) -> ItemRecord {
        ItemRecord {
            id: ItemId::from(id),
            content_type: Some(ContentType::Movie),
            title: id.to_string(),
            cover_image: None,
            link: None,
            link_description: None,
            comment: None,
            added_by: Some(added_by.to_string()),
            genres: None,
            priority: Some(1),
            length: None,
            watch_status: Some(WatchStatus::Unwatched),
            date_added: None,
            seasons: None,
            has_new_seasons: None,
            total_available_seasons: None,
            series_status: None,
        }
    }

    #[tokio::test]
    async fn test_unfiltered_reload_computes_contributors() {
        let mut gateway = MockCatalogGateway::new();
        gateway
            .expect_list_catalog()
            .times(1)
            .returning(|_| {
                Ok(vec![
                    record("m1", "Zoe"),
                    record("m2", "Adam"),
                    record("m3", "Zoe"),
                ])
            });

        let state = AppState::new();
        let loader = CatalogLoader::new(Arc::new(gateway), state.clone());
        assert_ok!(loader.reload().await);

        let inner = state.inner.read().await;
        assert_eq!(inner.catalog.len(), 3);
        assert_eq!(
            inner.contributors,
            Some(vec!["Adam".to_string(), "Zoe".to_string()])
        );
        assert!(!inner.loading);
    }

    #[tokio::test]
    async fn test_filtered_load_keeps_contributor_list() {
        let mut gateway = MockCatalogGateway::new();
        gateway
            .expect_list_catalog()
            .with(eq(CatalogFilter {
                watch_status: None,
                added_by: Some("Zoe".to_string()),
            }))
            .times(1)
            .returning(|_| Ok(vec![record("m1", "Zoe")]));

        let state = AppState::new();
        state.inner.write().await.contributors =
            Some(vec!["Adam".to_string(), "Zoe".to_string()]);
        let loader = CatalogLoader::new(Arc::new(gateway), state.clone());

        assert_ok!(
            loader
                .set_filter(CatalogFilter {
                    watch_status: None,
                    added_by: Some("Zoe".to_string()),
                })
                .await
        );

        let inner = state.inner.read().await;
        assert_eq!(inner.catalog.len(), 1);
        assert_eq!(inner.contributors.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_first_filtered_load_fetches_contributors_once() {
        let mut gateway = MockCatalogGateway::new();
        gateway
            .expect_list_catalog()
            .withf(|filter| !filter.is_unfiltered())
            .times(1)
            .returning(|_| Ok(vec![record("m1", "Zoe")]));
        gateway
            .expect_list_catalog()
            .withf(|filter| filter.is_unfiltered())
            .times(1)
            .returning(|_| Ok(vec![record("m1", "Zoe"), record("m2", "Adam")]));

        let state = AppState::new();
        let loader = CatalogLoader::new(Arc::new(gateway), state.clone());
        assert_ok!(
            loader
                .set_filter(CatalogFilter {
                    watch_status: Some(WatchStatus::Watched),
                    added_by: None,
                })
                .await
        );

        let inner = state.inner.read().await;
        assert_eq!(inner.catalog.len(), 1);
        assert_eq!(
            inner.contributors,
            Some(vec!["Adam".to_string(), "Zoe".to_string()])
        );
    }

    #[tokio::test]
    async fn test_reload_rebases_unconfirmed_priority() {
        let mut gateway = MockCatalogGateway::new();
        gateway.expect_list_catalog().returning(|_| {
            let mut stored = record("m1", "Zoe");
            stored.priority = Some(4);
            Ok(vec![stored])
        });

        let state = AppState::new();
        let mut lane = PriorityLane::new(1);
        lane.deltas.push(PriorityDelta { seq: 0, delta: 1 });
        state
            .inner
            .write()
            .await
            .priorities
            .insert(ItemId::from("m1"), lane);

        let loader = CatalogLoader::new(Arc::new(gateway), state.clone());
        assert_ok!(loader.reload().await);

        let inner = state.inner.read().await;
        assert_eq!(inner.catalog[0].item.priority, 5);
        assert_eq!(inner.priorities[&ItemId::from("m1")].base, 4);
    }

    #[tokio::test]
    async fn test_blank_search_falls_back_to_reload() {
        let mut gateway = MockCatalogGateway::new();
        gateway.expect_search_catalog().never();
        gateway
            .expect_list_catalog()
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let loader = CatalogLoader::new(Arc::new(gateway), AppState::new());
        assert_ok!(loader.search("   ").await);
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let mut gateway = MockCatalogGateway::new();
        gateway.expect_search_catalog().returning(|_| {
            let mut untyped = record("x", "Zoe");
            untyped.content_type = None;
            Ok(vec![untyped, record("m1", "Zoe")])
        });

        let state = AppState::new();
        let loader = CatalogLoader::new(Arc::new(gateway), state.clone());
        assert_ok!(loader.search("m").await);
        assert_eq!(state.inner.read().await.catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_raises_notice() {
        let mut gateway = MockCatalogGateway::new();
        gateway.expect_list_catalog().returning(|_| {
            Err(AppError::Remote {
                status: 500,
                message: "boom".to_string(),
            })
        });

        let state = AppState::new();
        let loader = CatalogLoader::new(Arc::new(gateway), state.clone());
        assert_err!(loader.reload().await);

        let notices = state.notices().await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Failed to load catalog.");
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }
}
