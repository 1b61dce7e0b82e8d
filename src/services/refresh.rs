use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{BulkRefreshSummary, CatalogItem, ItemId},
    services::{
        catalog::CatalogLoader, gateway::CatalogGateway, mutations::MutationController,
        notifications::NotificationLifecycle,
    },
    state::{AppState, NoticeLevel, PendingOp},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshAllOutcome {
    /// At least one series gained seasons; catalog and notifications reloaded
    Updated(BulkRefreshSummary),
    NoChanges(BulkRefreshSummary),
    /// Another bulk refresh was already running; nothing was sent
    AlreadyRunning,
}

/// Releases the bulk-refresh flag when dropped
struct RunningGuard(Arc<AtomicBool>);

impl RunningGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Bulk and per-series season refresh
#[derive(Clone)]
pub struct RefreshOrchestrator {
    gateway: Arc<dyn CatalogGateway>,
    state: AppState,
    loader: CatalogLoader,
    mutations: MutationController,
    notifications: NotificationLifecycle,
    running: Arc<AtomicBool>,
}

impl RefreshOrchestrator {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        state: AppState,
        loader: CatalogLoader,
        mutations: MutationController,
        notifications: NotificationLifecycle,
    ) -> Self {
        Self {
            gateway,
            state,
            loader,
            mutations,
            notifications,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Checks every tracked series for new seasons.
    ///
    /// Per-series failures inside the job are part of the summary, not an
    /// error. Only a failure of the call itself is.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_all(&self) -> AppResult<RefreshAllOutcome> {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            tracing::debug!("Bulk refresh already running, ignoring request");
            return Ok(RefreshAllOutcome::AlreadyRunning);
        };

        let summary = match self.gateway.refresh_all_series().await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "Bulk series refresh failed");
                self.state
                    .push_notice(
                        NoticeLevel::Error,
                        "Failed to refresh series. Please try again.",
                    )
                    .await;
                return Err(e);
            }
        };

        if summary.updated_count == 0 {
            self.state
                .push_notice(
                    NoticeLevel::Info,
                    format!(
                        "Checked {} series, no new seasons found",
                        summary.total_processed
                    ),
                )
                .await;
            return Ok(RefreshAllOutcome::NoChanges(summary));
        }

        if let Err(e) = self.loader.reload().await {
            tracing::warn!(error = %e, "Reload after bulk refresh failed");
        }
        if let Err(e) = self.notifications.fetch().await {
            tracing::warn!(error = %e, "Notification fetch after bulk refresh failed");
        }
        self.state
            .push_notice(
                NoticeLevel::Success,
                format!(
                    "Refreshed {} series: {} updated, {} failed",
                    summary.total_processed, summary.updated_count, summary.failure_count
                ),
            )
            .await;

        Ok(RefreshAllOutcome::Updated(summary))
    }

    /// Syncs one series' season count with the external provider
    pub async fn refresh_series(&self, id: &ItemId) -> AppResult<CatalogItem> {
        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        self.mutations
            .run_confirmed(id, PendingOp::Refresh, move |_| async move {
                gateway.refresh_series(&target).await
            })
            .await
    }

    pub async fn add_season(&self, id: &ItemId) -> AppResult<CatalogItem> {
        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        self.mutations
            .run_confirmed(id, PendingOp::AddSeason, move |_| async move {
                gateway.add_season(&target).await
            })
            .await
    }

    /// The store refuses to remove the only season; its message becomes the
    /// notice text.
    pub async fn remove_season(&self, id: &ItemId) -> AppResult<CatalogItem> {
        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        self.mutations
            .run_confirmed(id, PendingOp::RemoveSeason, move |_| async move {
                gateway.remove_season(&target).await
            })
            .await
    }
}
