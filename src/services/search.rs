/// Search-as-you-type against the external metadata provider.
///
/// Every new query, target toggle or clear bumps a generation number. A
/// request only applies its response if its generation is still current
/// and its cancellation token never fired, so the last issued query always
/// wins regardless of response arrival order.
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    error::AppResult,
    models::{ContentType, EnrichedMetadata, MetadataCandidate},
    services::gateway::MetadataGateway,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPolicy {
    /// Auto queries shorter than this never reach the provider
    pub min_chars: usize,
    pub debounce: Duration,
    pub max_results: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrigin {
    /// Keystroke-driven; debounced and subject to the minimum length
    Auto,
    /// Explicit search button; fires immediately
    Manual,
}

/// Visible search state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSnapshot {
    pub target: ContentType,
    pub results: Vec<MetadataCandidate>,
    pub popup_open: bool,
    pub searching: bool,
}

struct SearchInner {
    target: ContentType,
    /// Bumped on every target toggle; guards enrichment responses
    target_epoch: u64,
    generation: u64,
    debounce: Option<JoinHandle<()>>,
    in_flight: Option<CancellationToken>,
    results: Vec<MetadataCandidate>,
    popup_open: bool,
    searching: bool,
}

impl SearchInner {
    /// Drops every pending and in-flight request; returns the new generation
    fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        if let Some(timer) = self.debounce.take() {
            timer.abort();
        }
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.searching = false;
        self.generation
    }

    fn clear_results(&mut self) {
        self.results.clear();
        self.popup_open = false;
    }
}

#[derive(Clone)]
pub struct SearchCoordinator {
    gateway: Arc<dyn MetadataGateway>,
    policy: SearchPolicy,
    inner: Arc<Mutex<SearchInner>>,
    /// Highest generation that has finished or been dropped
    settled: Arc<watch::Sender<u64>>,
}

impl SearchCoordinator {
    pub fn new(gateway: Arc<dyn MetadataGateway>, policy: SearchPolicy, target: ContentType) -> Self {
        Self {
            gateway,
            policy,
            inner: Arc::new(Mutex::new(SearchInner {
                target,
                target_epoch: 0,
                generation: 0,
                debounce: None,
                in_flight: None,
                results: Vec::new(),
                popup_open: false,
                searching: false,
            })),
            settled: Arc::new(watch::Sender::new(0)),
        }
    }

    pub fn policy(&self) -> SearchPolicy {
        self.policy
    }

    /// Schedules a metadata search for `text`.
    ///
    /// Returns once the request is scheduled; the response lands in the
    /// snapshot when it arrives.
    pub async fn query(&self, text: &str, origin: QueryOrigin) {
        let query = text.trim().to_string();
        let mut inner = self.inner.lock().await;
        let generation = inner.invalidate();

        let too_short =
            origin == QueryOrigin::Auto && query.chars().count() < self.policy.min_chars;
        if query.is_empty() || too_short {
            inner.clear_results();
            self.settle(generation);
            return;
        }

        let delay = match origin {
            QueryOrigin::Auto => Some(self.policy.debounce),
            QueryOrigin::Manual => None,
        };

        let coordinator = self.clone();
        inner.debounce = Some(tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            coordinator.fire(generation, query).await;
            coordinator.settle(generation);
        }));
    }

    fn settle(&self, generation: u64) {
        self.settled.send_if_modified(|done| {
            let advanced = generation > *done;
            if advanced {
                *done = generation;
            }
            advanced
        });
    }

    async fn fire(&self, generation: u64, query: String) {
        let (target, token) = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return;
            }
            if let Some(previous) = inner.in_flight.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            inner.in_flight = Some(token.clone());
            inner.searching = true;
            (inner.target, token)
        };

        tracing::debug!(query = %query, kind = %target, generation, "Metadata search fired");
        let result = self
            .gateway
            .search_external_metadata(target, &query, token.clone())
            .await;

        let mut inner = self.inner.lock().await;
        if token.is_cancelled() || inner.generation != generation {
            tracing::debug!(query = %query, generation, "Discarding superseded search response");
            return;
        }
        inner.in_flight = None;
        inner.searching = false;

        match result {
            Ok(mut candidates) => {
                candidates.truncate(self.policy.max_results);
                inner.popup_open = !candidates.is_empty();
                inner.results = candidates;
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Metadata search failed");
                inner.clear_results();
            }
        }
    }

    /// Switches between movie and series lookups, dropping all search state
    pub async fn set_target(&self, target: ContentType) {
        let mut inner = self.inner.lock().await;
        if inner.target == target {
            return;
        }
        let generation = inner.invalidate();
        inner.clear_results();
        inner.target = target;
        inner.target_epoch += 1;
        self.settle(generation);
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        let generation = inner.invalidate();
        inner.clear_results();
        self.settle(generation);
    }

    /// Resolves once the scheduled search, if any, has run to completion
    pub async fn wait_idle(&self) {
        let generation = self.inner.lock().await.generation;
        let mut settled = self.settled.subscribe();
        // The sender lives as long as `self`, so this never sees a closed channel
        let _ = settled.wait_for(|done| *done >= generation).await;
    }

    /// Closes the popup without discarding results
    pub async fn close_popup(&self) {
        self.inner.lock().await.popup_open = false;
    }

    pub async fn snapshot(&self) -> SearchSnapshot {
        let inner = self.inner.lock().await;
        SearchSnapshot {
            target: inner.target,
            results: inner.results.clone(),
            popup_open: inner.popup_open,
            searching: inner.searching,
        }
    }

    /// Fetches enriched details for a picked candidate.
    ///
    /// `Ok(None)` means the target type changed while the request was out
    /// and the response was dropped.
    pub async fn enrich(
        &self,
        external_id: u64,
        download_image: bool,
    ) -> AppResult<Option<EnrichedMetadata>> {
        let (target, epoch) = {
            let mut inner = self.inner.lock().await;
            inner.popup_open = false;
            (inner.target, inner.target_epoch)
        };

        let metadata = self
            .gateway
            .enrich_external_metadata(target, external_id, download_image)
            .await?;

        if self.inner.lock().await.target_epoch != epoch {
            tracing::debug!(external_id, "Discarding enrichment for a stale target type");
            return Ok(None);
        }
        Ok(Some(metadata))
    }
}
