use std::sync::Arc;

use crate::{
    models::RecommendationCandidate,
    services::gateway::FeedGateway,
    state::AppState,
};

/// Fetches watch recommendations
///
/// Ranking happens remotely; the client only asks for `count` candidates,
/// optionally narrowed to one contributor, and caches the latest answer.
#[derive(Clone)]
pub struct RecommendationFeed {
    gateway: Arc<dyn FeedGateway>,
    state: AppState,
    count: u32,
}

impl RecommendationFeed {
    pub fn new(gateway: Arc<dyn FeedGateway>, state: AppState, count: u32) -> Self {
        Self {
            gateway,
            state,
            count,
        }
    }

    /// Replaces the cached list. Failures clear it and are not surfaced.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, added_by: Option<String>) -> Vec<RecommendationCandidate> {
        let candidates = match self.gateway.list_recommendations(added_by, self.count).await {
            Ok(candidates) => {
                tracing::info!(count = candidates.len(), "Recommendations fetched");
                candidates
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch recommendations");
                Vec::new()
            }
        };

        self.state.inner.write().await.recommendations = candidates.clone();
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{ContentType, ItemId};
    use crate::services::gateway::MockFeedGateway;

    fn candidate(id: &str) -> RecommendationCandidate {
        RecommendationCandidate {
            id: ItemId::from(id),
            title: id.to_string(),
            content_type: ContentType::Movie,
            cover_image: None,
            link: None,
            comment: None,
            priority: Some(3),
            has_new_seasons: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_passes_count_and_contributor() {
        let mut gateway = MockFeedGateway::new();
        gateway
            .expect_list_recommendations()
            .withf(|added_by, count| added_by.as_deref() == Some("Zoe") && *count == 4)
            .times(1)
            .returning(|_, _| Ok(vec![candidate("m1"), candidate("m2")]));

        let state = AppState::new();
        let feed = RecommendationFeed::new(Arc::new(gateway), state.clone(), 4);

        let fetched = feed.fetch(Some("Zoe".to_string())).await;
        assert_eq!(fetched.len(), 2);
        assert_eq!(state.inner.read().await.recommendations.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_clears_cached_list() {
        let mut gateway = MockFeedGateway::new();
        gateway
            .expect_list_recommendations()
            .returning(|_, _| Err(AppError::Internal("ranking unavailable".to_string())));

        let state = AppState::new();
        state.inner.write().await.recommendations = vec![candidate("stale")];
        let feed = RecommendationFeed::new(Arc::new(gateway), state.clone(), 4);

        assert!(feed.fetch(None).await.is_empty());
        let inner = state.inner.read().await;
        assert!(inner.recommendations.is_empty());
        assert!(inner.notices.is_empty());
    }
}
