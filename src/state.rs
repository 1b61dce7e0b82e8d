use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{CatalogFilter, CatalogItem, ItemId, Notification, RecommendationCandidate};

/// High-risk operation awaiting remote confirmation on an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingOp {
    WatchStatus,
    SeasonStatus(u32),
    AddSeason,
    RemoveSeason,
    Refresh,
    Update,
    Delete,
}

/// Catalog item plus client-only view flags
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub item: CatalogItem,
    /// Deleted on the server; stays visible and inert until the next reload
    pub deleted: bool,
    pub pending: Option<PendingOp>,
}

impl ItemView {
    pub fn new(item: CatalogItem) -> Self {
        Self {
            item,
            deleted: false,
            pending: None,
        }
    }

    pub fn is_inert(&self) -> bool {
        self.deleted || self.pending.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityDelta {
    pub seq: u64,
    pub delta: i64,
}

/// Priority changes on one item that the remote store has not confirmed.
///
/// `base` is the last value known to be stored remotely. The visible
/// priority is always `base` plus the outstanding deltas, floored at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityLane {
    pub base: u32,
    pub deltas: Vec<PriorityDelta>,
}

impl PriorityLane {
    pub fn new(base: u32) -> Self {
        Self {
            base,
            deltas: Vec::new(),
        }
    }

    pub fn outstanding(&self) -> i64 {
        self.deltas.iter().map(|d| d.delta).sum()
    }

    pub fn local(&self) -> u32 {
        let value = (i64::from(self.base) + self.outstanding()).max(0);
        u32::try_from(value).unwrap_or(u32::MAX)
    }

    /// Drops every delta up to `seq`. A confirmed write becomes the new base;
    /// a failed one leaves the base alone, which reverses exactly the
    /// dropped deltas.
    pub fn settle(&mut self, seq: u64, written: Option<u32>) {
        self.deltas.retain(|d| d.seq > seq);
        if let Some(value) = written {
            self.base = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Transient, dismissible message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub message: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<RwLock<AppStateInner>>,
}

/// Inner state that can be modified
#[derive(Debug, Default)]
pub struct AppStateInner {
    pub catalog: Vec<ItemView>,
    pub filter: CatalogFilter,
    /// Contributors across the unfiltered catalog; `None` until first computed
    pub contributors: Option<Vec<String>>,
    pub notifications: Vec<Notification>,
    /// Notification ids with a dismissal in flight
    pub dismissing: HashSet<String>,
    pub recommendations: Vec<RecommendationCandidate>,
    pub notices: Vec<Notice>,
    pub loading: bool,
    /// Items with a priority writer running
    pub priorities: HashMap<ItemId, PriorityLane>,
}

impl AppStateInner {
    pub fn find(&self, id: &ItemId) -> Option<&ItemView> {
        self.catalog.iter().find(|view| &view.item.id == id)
    }

    pub fn find_mut(&mut self, id: &ItemId) -> Option<&mut ItemView> {
        self.catalog.iter_mut().find(|view| &view.item.id == id)
    }

    pub fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.notices.push(Notice {
            id,
            level,
            message: message.into(),
        });
        id
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates a new empty application state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(AppStateInner::default())),
        }
    }

    pub async fn push_notice(&self, level: NoticeLevel, message: impl Into<String>) -> Uuid {
        self.inner.write().await.push_notice(level, message)
    }

    /// Removes a notice; returns false when it was already gone
    pub async fn dismiss_notice(&self, id: Uuid) -> bool {
        let mut state = self.inner.write().await;
        let before = state.notices.len();
        state.notices.retain(|notice| notice.id != id);
        state.notices.len() != before
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.inner.read().await.notices.clone()
    }

    pub async fn item(&self, id: &ItemId) -> Option<ItemView> {
        self.inner.read().await.find(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notices_are_ordered_and_dismissible() {
        let state = AppState::new();
        let first = state.push_notice(NoticeLevel::Info, "one").await;
        let second = state.push_notice(NoticeLevel::Error, "two").await;

        let notices = state.notices().await;
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].id, first);
        assert_eq!(notices[1].level, NoticeLevel::Error);

        assert!(state.dismiss_notice(first).await);
        assert!(!state.dismiss_notice(first).await);
        assert_eq!(state.notices().await[0].id, second);
    }

    #[test]
    fn test_priority_lane_settle() {
        let mut lane = PriorityLane::new(1);
        lane.deltas = vec![
            PriorityDelta { seq: 0, delta: 1 },
            PriorityDelta { seq: 1, delta: 1 },
        ];
        assert_eq!(lane.local(), 3);

        // Failed write of the first delta only
        lane.settle(0, None);
        assert_eq!(lane.local(), 2);

        lane.settle(1, Some(2));
        assert_eq!(lane.base, 2);
        assert!(lane.deltas.is_empty());
    }

    #[test]
    fn test_priority_lane_floors_at_zero() {
        let mut lane = PriorityLane::new(0);
        lane.deltas = vec![
            PriorityDelta { seq: 4, delta: 1 },
            PriorityDelta { seq: 5, delta: -1 },
        ];
        lane.settle(4, None);
        assert_eq!(lane.local(), 0);
    }
}
