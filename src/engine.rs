use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    models::ContentType,
    services::{
        aggregate::{derive_catalog, CatalogView},
        catalog::CatalogLoader,
        gateway::{CatalogGateway, FeedGateway, HttpGateway, MetadataGateway, RemoteGateway},
        images::ImageService,
        mutations::MutationController,
        notifications::{DismissOutcome, NotificationLifecycle},
        recommendations::RecommendationFeed,
        refresh::RefreshOrchestrator,
        search::SearchCoordinator,
    },
    state::AppState,
};

/// Every controller wired over one state and one remote gateway
#[derive(Clone)]
pub struct SyncEngine {
    pub state: AppState,
    pub catalog: CatalogLoader,
    pub search: SearchCoordinator,
    pub mutations: MutationController,
    pub refresh: RefreshOrchestrator,
    pub notifications: NotificationLifecycle,
    pub recommendations: RecommendationFeed,
    pub images: ImageService,
    gateway_name: &'static str,
}

impl SyncEngine {
    pub fn new<G>(gateway: G, config: &Config) -> Self
    where
        G: RemoteGateway + 'static,
    {
        let gateway_name = gateway.name();
        let gateway = Arc::new(gateway);
        let catalog_gateway: Arc<dyn CatalogGateway> = gateway.clone();
        let metadata_gateway: Arc<dyn MetadataGateway> = gateway.clone();
        let feed_gateway: Arc<dyn FeedGateway> = gateway;

        let state = AppState::new();
        let catalog = CatalogLoader::new(Arc::clone(&catalog_gateway), state.clone());
        let mutations =
            MutationController::new(Arc::clone(&catalog_gateway), state.clone(), catalog.clone());
        let notifications = NotificationLifecycle::new(Arc::clone(&feed_gateway), state.clone());
        let refresh = RefreshOrchestrator::new(
            catalog_gateway,
            state.clone(),
            catalog.clone(),
            mutations.clone(),
            notifications.clone(),
        );

        Self {
            search: SearchCoordinator::new(
                Arc::clone(&metadata_gateway),
                config.search_policy(),
                ContentType::Movie,
            ),
            images: ImageService::new(metadata_gateway, config.api_base_url.clone()),
            recommendations: RecommendationFeed::new(
                feed_gateway,
                state.clone(),
                config.recommendation_count,
            ),
            state,
            catalog,
            mutations,
            refresh,
            notifications,
            gateway_name,
        }
    }

    /// Engine backed by the REST gateway described by `config`
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self::new(HttpGateway::new(config)?, config))
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway_name
    }

    /// Initial load: catalog and notifications side by side, then
    /// recommendations. Only a catalog failure is returned.
    pub async fn bootstrap(&self) -> AppResult<()> {
        tracing::info!(gateway = self.gateway_name, "Bootstrapping sync engine");

        let (catalog, notifications) =
            tokio::join!(self.catalog.reload(), self.notifications.fetch());
        if let Err(e) = notifications {
            tracing::warn!(error = %e, "Failed to load notifications");
        }
        self.recommendations.fetch(None).await;
        catalog
    }

    /// Dismisses a notification and re-reads the list on success
    pub async fn dismiss_notification(&self, id: &str) -> AppResult<DismissOutcome> {
        let outcome = self.notifications.dismiss(id).await?;
        if outcome == DismissOutcome::Dismissed {
            if let Err(e) = self.notifications.fetch().await {
                tracing::warn!(error = %e, "Failed to refresh notifications after dismissal");
            }
        }
        Ok(outcome)
    }

    /// Derived view of the current state
    pub async fn view(&self) -> CatalogView {
        derive_catalog(&*self.state.inner.read().await)
    }
}
