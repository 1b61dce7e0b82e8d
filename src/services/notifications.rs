use std::sync::Arc;

use crate::{
    error::AppResult,
    models::Notification,
    services::gateway::FeedGateway,
    state::{AppState, NoticeLevel},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissOutcome {
    /// Removed locally; the caller should re-fetch the authoritative list
    Dismissed,
    /// A dismissal for this id was already in flight
    Suppressed,
}

/// Active "new seasons" notifications, kept apart from catalog items
#[derive(Clone)]
pub struct NotificationLifecycle {
    gateway: Arc<dyn FeedGateway>,
    state: AppState,
}

impl NotificationLifecycle {
    pub fn new(gateway: Arc<dyn FeedGateway>, state: AppState) -> Self {
        Self { gateway, state }
    }

    pub async fn fetch(&self) -> AppResult<Vec<Notification>> {
        let notifications = self.gateway.list_notifications().await?;
        tracing::info!(count = notifications.len(), "Notifications fetched");
        self.state.inner.write().await.notifications = notifications.clone();
        Ok(notifications)
    }

    /// Dismisses one notification. The referenced series is never checked;
    /// it may already be gone.
    pub async fn dismiss(&self, id: &str) -> AppResult<DismissOutcome> {
        if !self.state.inner.write().await.dismissing.insert(id.to_string()) {
            tracing::debug!(notification_id = %id, "Dismissal already in flight");
            return Ok(DismissOutcome::Suppressed);
        }

        let result = self.gateway.dismiss_notification(id).await;

        let mut state = self.state.inner.write().await;
        state.dismissing.remove(id);
        match result {
            Ok(()) => {
                state.notifications.retain(|n| n.id != id);
                tracing::info!(notification_id = %id, "Notification dismissed");
                Ok(DismissOutcome::Dismissed)
            }
            Err(e) => {
                tracing::error!(notification_id = %id, error = %e, "Failed to dismiss notification");
                state.push_notice(
                    NoticeLevel::Error,
                    "Failed to dismiss notification. Please try again.",
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::ItemId;
    use crate::services::gateway::MockFeedGateway;

    fn notification(id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            series_id: ItemId::from("s1"),
            series_title: "Severance".to_string(),
            message: "1 new season available".to_string(),
            new_seasons_count: 1,
            created_at: None,
        }
    }

    async fn lifecycle_with(gateway: MockFeedGateway) -> (NotificationLifecycle, AppState) {
        let state = AppState::new();
        state.inner.write().await.notifications = vec![notification("n1"), notification("n2")];
        (NotificationLifecycle::new(Arc::new(gateway), state.clone()), state)
    }

    #[tokio::test]
    async fn test_dismiss_removes_only_that_id() {
        let mut gateway = MockFeedGateway::new();
        gateway
            .expect_dismiss_notification()
            .withf(|value| value == "n1")
            .times(1)
            .returning(|_| Ok(()));

        let (lifecycle, state) = lifecycle_with(gateway).await;
        assert_eq!(lifecycle.dismiss("n1").await.unwrap(), DismissOutcome::Dismissed);

        let inner = state.inner.read().await;
        assert_eq!(inner.notifications.len(), 1);
        assert_eq!(inner.notifications[0].id, "n2");
        assert!(inner.dismissing.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_dismissal_is_suppressed() {
        let mut gateway = MockFeedGateway::new();
        gateway.expect_dismiss_notification().never();

        let (lifecycle, state) = lifecycle_with(gateway).await;
        state.inner.write().await.dismissing.insert("n1".to_string());

        assert_eq!(lifecycle.dismiss("n1").await.unwrap(), DismissOutcome::Suppressed);
        assert_eq!(state.inner.read().await.notifications.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_dismissal_keeps_notification() {
        let mut gateway = MockFeedGateway::new();
        gateway.expect_dismiss_notification().returning(|_| {
            Err(AppError::Remote {
                status: 500,
                message: "storage error".to_string(),
            })
        });

        let (lifecycle, state) = lifecycle_with(gateway).await;
        assert!(lifecycle.dismiss("n2").await.is_err());

        let inner = state.inner.read().await;
        assert_eq!(inner.notifications.len(), 2);
        assert!(inner.dismissing.is_empty());
        assert_eq!(
            inner.notices[0].message,
            "Failed to dismiss notification. Please try again."
        );
    }
}
