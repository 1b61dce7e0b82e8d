/// Local-first and confirm-first catalog mutations.
///
/// Priority nudges are applied locally right away and written in the
/// background. Everything else waits for the remote store and adopts the
/// record it returns; a failure raises a notice and reloads the catalog.
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, ContentType, ItemDraft, ItemId, ItemRecord, WatchStatus},
    services::{catalog::CatalogLoader, gateway::CatalogGateway},
    state::{AppState, ItemView, NoticeLevel, PendingOp, PriorityDelta, PriorityLane},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityNudge {
    Up,
    Down,
}

#[derive(Clone)]
pub struct MutationController {
    gateway: Arc<dyn CatalogGateway>,
    state: AppState,
    loader: CatalogLoader,
    background: TaskTracker,
    next_seq: Arc<AtomicU64>,
}

impl MutationController {
    pub fn new(gateway: Arc<dyn CatalogGateway>, state: AppState, loader: CatalogLoader) -> Self {
        Self {
            gateway,
            state,
            loader,
            background: TaskTracker::new(),
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Moves priority by one, clamped at zero. Returns the new local value.
    ///
    /// The remote write runs in the background, one writer per item, and
    /// always sends the latest local value. A failed write reverses the
    /// deltas it carried and is otherwise absorbed.
    pub async fn nudge_priority(&self, id: &ItemId, nudge: PriorityNudge) -> AppResult<u32> {
        let (kind, priority, start_writer) = {
            let mut state = self.state.inner.write().await;
            let inner = &mut *state;
            let view = inner
                .catalog
                .iter_mut()
                .find(|view| &view.item.id == id)
                .filter(|view| !view.deleted)
                .ok_or_else(|| AppError::NotFound(format!("Item {}", id)))?;

            let current = view.item.priority;
            let next = match nudge {
                PriorityNudge::Up => current.saturating_add(1),
                PriorityNudge::Down => current.saturating_sub(1),
            };
            if next == current {
                return Ok(current);
            }
            view.item.priority = next;

            let start_writer = !inner.priorities.contains_key(id);
            inner
                .priorities
                .entry(id.clone())
                .or_insert_with(|| PriorityLane::new(current))
                .deltas
                .push(PriorityDelta {
                    seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                    delta: i64::from(next) - i64::from(current),
                });
            (view.item.content_type, next, start_writer)
        };

        if start_writer {
            let controller = self.clone();
            let id = id.clone();
            self.background
                .spawn(async move { controller.write_priority(id, kind).await });
        }
        Ok(priority)
    }

    /// Drains the item's priority lane one write at a time
    async fn write_priority(&self, id: ItemId, kind: ContentType) {
        loop {
            let (target, base, seq) = {
                let mut state = self.state.inner.write().await;
                let last = match state.priorities.get(&id) {
                    Some(lane) => lane.deltas.last().map(|d| (lane.local(), lane.base, d.seq)),
                    None => return,
                };
                match last {
                    Some(next) => next,
                    None => {
                        state.priorities.remove(&id);
                        return;
                    }
                }
            };

            let written = if target == base {
                Some(target)
            } else {
                match self.gateway.set_priority(&id, kind, target).await {
                    Ok(()) => Some(target),
                    Err(e) => {
                        tracing::warn!(item_id = %id, priority = target, error = %e, "Priority update failed, reverting");
                        None
                    }
                }
            };

            let mut state = self.state.inner.write().await;
            let inner = &mut *state;
            let (local, drained) = match inner.priorities.get_mut(&id) {
                Some(lane) => {
                    lane.settle(seq, written);
                    (lane.local(), lane.deltas.is_empty())
                }
                None => return,
            };
            if let Some(view) = inner.find_mut(&id) {
                view.item.priority = local;
            }
            if drained {
                inner.priorities.remove(&id);
                return;
            }
        }
    }

    /// Sum of priority deltas still awaiting the remote store
    pub async fn pending_priority_delta(&self, id: &ItemId) -> i64 {
        self.state
            .inner
            .read()
            .await
            .priorities
            .get(id)
            .map(PriorityLane::outstanding)
            .unwrap_or(0)
    }

    /// Waits for every background write issued so far
    pub async fn flush_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Marks `id` as busy with `op` and returns its content type
    async fn begin(&self, id: &ItemId, op: PendingOp) -> AppResult<ContentType> {
        let mut state = self.state.inner.write().await;
        let view = state
            .find_mut(id)
            .filter(|view| !view.deleted)
            .ok_or_else(|| AppError::NotFound(format!("Item {}", id)))?;

        if let Some(in_flight) = view.pending {
            tracing::debug!(item_id = %id, ?in_flight, requested = ?op, "Item busy, ignoring request");
            return Err(AppError::Busy(id.to_string()));
        }
        view.pending = Some(op);
        Ok(view.item.content_type)
    }

    /// Clears the busy flag, raises a notice and reloads
    async fn fail<T>(&self, id: &ItemId, op: PendingOp, error: AppError) -> AppResult<T> {
        {
            let mut state = self.state.inner.write().await;
            if let Some(view) = state.find_mut(id) {
                view.pending = None;
            }
            if error.is_cancelled() {
                return Err(error);
            }
            tracing::error!(item_id = %id, ?op, error = %error, "Catalog mutation failed");
            state.push_notice(NoticeLevel::Error, error.user_message());
        }

        if let Err(e) = self.loader.reload().await {
            tracing::warn!(error = %e, "Reload after failed mutation also failed");
        }
        Err(error)
    }

    /// Runs a confirm-first operation on an existing item and adopts the
    /// server's record, keeping the local content type when the response
    /// omits it.
    pub async fn run_confirmed<F, Fut>(
        &self,
        id: &ItemId,
        op: PendingOp,
        call: F,
    ) -> AppResult<CatalogItem>
    where
        F: FnOnce(ContentType) -> Fut,
        Fut: Future<Output = AppResult<ItemRecord>>,
    {
        let kind = self.begin(id, op).await?;

        let item = match call(kind)
            .await
            .and_then(|record| CatalogItem::from_record(record, Some(kind)))
        {
            Ok(item) => item,
            Err(e) => return self.fail(id, op, e).await,
        };

        let mut state = self.state.inner.write().await;
        if let Some(view) = state.find_mut(id) {
            view.item = item.clone();
            view.pending = None;
        }
        tracing::info!(item_id = %id, ?op, status = ?item.watch_status, "Mutation confirmed");
        Ok(item)
    }

    /// Movie status, or mark every season of a series at once
    pub async fn set_watch_status(&self, id: &ItemId, status: WatchStatus) -> AppResult<CatalogItem> {
        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        self.run_confirmed(id, PendingOp::WatchStatus, move |kind| async move {
            gateway.set_watch_status(&target, kind, status).await
        })
        .await
    }

    pub async fn toggle_watch_status(&self, id: &ItemId) -> AppResult<CatalogItem> {
        let current = self
            .state
            .item(id)
            .await
            .map(|view| view.item.watch_status)
            .ok_or_else(|| AppError::NotFound(format!("Item {}", id)))?;
        self.set_watch_status(id, current.toggled()).await
    }

    pub async fn toggle_season(&self, id: &ItemId, season_number: u32) -> AppResult<CatalogItem> {
        let current = self
            .state
            .item(id)
            .await
            .and_then(|view| view.item.season(season_number).map(|s| s.watch_status))
            .ok_or_else(|| AppError::NotFound(format!("Season {} of {}", season_number, id)))?;

        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        self.run_confirmed(id, PendingOp::SeasonStatus(season_number), move |_| async move {
            gateway
                .set_season_watch_status(&target, season_number, current.toggled())
                .await
        })
        .await
    }

    pub async fn create_item(&self, draft: &ItemDraft) -> AppResult<CatalogItem> {
        draft.validate(true)?;
        let kind = draft.content_type;

        let item = match self
            .gateway
            .create_item(kind, &draft.payload(true))
            .await
            .and_then(|record| CatalogItem::from_record(record, Some(kind)))
        {
            Ok(item) => item,
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::error!(kind = %kind, error = %e, "Failed to create item");
                    self.state
                        .push_notice(NoticeLevel::Error, e.user_message())
                        .await;
                    if let Err(reload) = self.loader.reload().await {
                        tracing::warn!(error = %reload, "Reload after failed create also failed");
                    }
                }
                return Err(e);
            }
        };

        let mut state = self.state.inner.write().await;
        if let Some(name) = item.added_by.clone() {
            add_contributor(&mut state.contributors, name);
        }
        state.catalog.push(ItemView::new(item.clone()));
        state.push_notice(NoticeLevel::Success, format!("Added \"{}\"", item.title));
        tracing::info!(item_id = %item.id, kind = %kind, "Item created");
        Ok(item)
    }

    /// Saves edited fields; the content type and seasons stay as stored
    pub async fn update_item(&self, id: &ItemId, draft: &ItemDraft) -> AppResult<CatalogItem> {
        draft.validate(false)?;
        let payload = draft.payload(false);

        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        let item = self
            .run_confirmed(id, PendingOp::Update, move |kind| async move {
                gateway.update_item(&target, kind, &payload).await
            })
            .await?;

        if let Some(name) = item.added_by.clone() {
            add_contributor(&mut self.state.inner.write().await.contributors, name);
        }
        Ok(item)
    }

    /// Deletes remotely, then leaves the row in place but inert until the
    /// next reload
    pub async fn delete_item(&self, id: &ItemId) -> AppResult<()> {
        let kind = self.begin(id, PendingOp::Delete).await?;

        if let Err(e) = self.gateway.delete_item(id, kind).await {
            return self.fail(id, PendingOp::Delete, e).await;
        }

        let mut state = self.state.inner.write().await;
        if let Some(view) = state.find_mut(id) {
            view.deleted = true;
            view.pending = None;
        }
        tracing::info!(item_id = %id, kind = %kind, "Item deleted");
        Ok(())
    }
}

fn add_contributor(contributors: &mut Option<Vec<String>>, name: String) {
    if let Some(names) = contributors {
        if let Err(position) = names.binary_search(&name) {
            names.insert(position, name);
        }
    }
}
