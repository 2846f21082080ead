//! List session
//!
//! A [`ListSession`] is the synchronization core for one open list view:
//! it owns the canonical item mirror and is the only place that mutates
//! it. Two inputs converge here - outcomes of this session's own mutation
//! requests, and raw notifications from the change feed - and both go
//! through the single [`ListSession::apply`] entry point, strictly in
//! arrival order.
//!
//! Mutations are optimistic: the local state changes before the store
//! confirms. A confirmed response overwrites the speculative value (it may
//! differ, e.g. normalized strings); a failed request reverts to the
//! pre-mutation value. The pre-mutation value lives only for the duration
//! of the request it shadows.
//!
//! Known limitation, by contract: an upsert replaces the whole record
//! (last-writer-wins). Concurrent edits to different fields of the same
//! item by two participants will have the later-arriving record discard
//! the earlier one's change. There is no field-level merge.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::event::{self, ChangeEvent, RawChange};
use crate::feed::SyncStatus;
use crate::models::{Item, ItemPatch, NewItem, ShoppingList};
use crate::order;
use crate::store::{RecordStore, StoreError, StoreResult};
use crate::view::{self, Billing, Counts, Filter};

/// What the rendering collaborator sees
#[derive(Debug, Clone)]
pub struct SessionView {
    /// Items matching the active filter, in display order
    pub items: Vec<Item>,
    pub counts: Counts,
    /// Absent when no item is priced
    pub billing: Option<Billing>,
    pub sync_status: SyncStatus,
}

/// The synchronization core for one open list view
///
/// Constructed when a view opens, destroyed when it closes; never shared
/// across views, so multiple sessions (tabs, tests) coexist without
/// interference.
pub struct ListSession {
    store: Arc<dyn RecordStore>,
    list: ShoppingList,
    /// Canonical state: the authoritative local mirror of the list
    items: Vec<Item>,
    filter: Filter,
    /// Ids deleted locally and awaiting confirmation; upserts for these
    /// are dropped by the normalizer so echoes cannot resurrect them
    pending_deletes: HashSet<Uuid>,
    status_rx: Option<watch::Receiver<SyncStatus>>,
}

impl std::fmt::Debug for ListSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListSession")
            .field("list", &self.list)
            .field("items", &self.items)
            .field("filter", &self.filter)
            .field("pending_deletes", &self.pending_deletes)
            .field("status_rx", &self.status_rx)
            .finish_non_exhaustive()
    }
}

impl ListSession {
    /// Open a session for the list behind `share_token`
    ///
    /// An unresolved token is terminal NotFound; there is nothing to retry.
    pub async fn open(store: Arc<dyn RecordStore>, share_token: &str) -> StoreResult<Self> {
        let list = store.get_list(share_token).await?;
        let mut items = store.get_items(list.id).await?;
        order::sort_canonical(&mut items);

        debug!(list_id = %list.id, items = items.len(), "opened list session");
        Ok(Self {
            store,
            list,
            items,
            filter: Filter::All,
            pending_deletes: HashSet::new(),
            status_rx: None,
        })
    }

    /// The list this session mirrors
    pub fn list(&self) -> &ShoppingList {
        &self.list
    }

    /// The canonical item mirror, in display order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The active filter
    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Switch the active filter
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Mirror the feed supervisor's connectivity in rendered views
    pub fn attach_status(&mut self, status_rx: watch::Receiver<SyncStatus>) {
        self.status_rx = Some(status_rx);
    }

    /// Current feed connectivity; Disconnected when no feed is attached
    pub fn sync_status(&self) -> SyncStatus {
        self.status_rx
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(SyncStatus::Disconnected)
    }

    /// Project the canonical state for rendering
    pub fn current_view(&self) -> SessionView {
        let projected = view::project(&self.items, self.filter);
        SessionView {
            items: projected.items,
            counts: projected.counts,
            billing: projected.billing,
            sync_status: self.sync_status(),
        }
    }

    // ==================== Reconciliation ====================

    /// Merge one canonical event into the mirror
    ///
    /// Events are processed to completion in call order; this is the only
    /// mutation path besides the optimistic pre-mutation steps below.
    pub fn apply(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::ItemUpserted(item) => {
                if item.list_id != self.list.id {
                    return;
                }
                match self.items.iter_mut().find(|i| i.id == item.id) {
                    // Wholesale replace: last writer wins on the full record
                    Some(existing) => *existing = item,
                    None => self.items.push(item),
                }
                order::sort_canonical(&mut self.items);
            }
            ChangeEvent::ItemRemoved(id) => {
                self.items.retain(|i| i.id != id);
            }
            ChangeEvent::BulkReplaced(mut items) => {
                order::sort_canonical(&mut items);
                self.items = items;
            }
        }
    }

    /// Normalize a raw feed notification, then reconcile it
    pub fn apply_raw(&mut self, raw: RawChange) {
        if let Some(event) = event::normalize(raw, &self.pending_deletes) {
            self.apply(event);
        }
    }

    // ==================== Mutation intents ====================

    /// Add an item to the end of the list
    ///
    /// Creates are not reflected until the store assigns the id: both id
    /// and sort_order are store-owned, and a guessed id risks divergent
    /// ordering across participants.
    pub async fn add_item(&mut self, fields: NewItem) -> StoreResult<Item> {
        let fields = fields.normalized();
        fields.validate().map_err(StoreError::Validation)?;

        let item = self.store.create_item(self.list.id, fields).await?;
        self.apply(ChangeEvent::ItemUpserted(item.clone()));
        Ok(item)
    }

    /// Update item fields, optimistically
    pub async fn update_item(&mut self, item_id: Uuid, patch: ItemPatch) -> StoreResult<Item> {
        patch.validate().map_err(StoreError::Validation)?;

        let prior = self
            .items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        let mut speculative = prior.clone();
        patch.apply_to(&mut speculative);
        self.apply(ChangeEvent::ItemUpserted(speculative));

        match self.store.update_item(self.list.id, item_id, patch).await {
            Ok(confirmed) => {
                // The stored record overwrites the speculative one
                self.apply(ChangeEvent::ItemUpserted(confirmed.clone()));
                Ok(confirmed)
            }
            Err(e) => {
                warn!(%item_id, error = %e, "update failed, reverting");
                self.apply(ChangeEvent::ItemUpserted(prior));
                Err(e)
            }
        }
    }

    /// Flip an item's bought flag, optimistically
    pub async fn toggle_bought(&mut self, item_id: Uuid) -> StoreResult<Item> {
        let bought = self
            .items
            .iter()
            .find(|i| i.id == item_id)
            .map(|i| i.bought)
            .ok_or(StoreError::NotFound)?;
        self.update_item(item_id, ItemPatch::bought(!bought)).await
    }

    /// Delete one item, optimistically
    pub async fn delete_item(&mut self, item_id: Uuid) -> StoreResult<()> {
        let prior = self
            .items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        self.pending_deletes.insert(item_id);
        self.apply(ChangeEvent::ItemRemoved(item_id));

        let result = self.store.delete_item(self.list.id, item_id).await;
        self.pending_deletes.remove(&item_id);

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(%item_id, error = %e, "delete failed, restoring");
                self.apply(ChangeEvent::ItemUpserted(prior));
                Err(e)
            }
        }
    }

    /// Remove every bought item, optimistically
    ///
    /// A failed clear resolves via a full re-sync rather than item-by-item
    /// restoration, since the store may have deleted a subset.
    pub async fn clear_bought(&mut self) -> StoreResult<()> {
        let removed: Vec<Item> = self.items.iter().filter(|i| i.bought).cloned().collect();
        if removed.is_empty() {
            return Ok(());
        }

        for item in &removed {
            self.pending_deletes.insert(item.id);
            self.apply(ChangeEvent::ItemRemoved(item.id));
        }

        let result = self.store.delete_bought(self.list.id).await;
        for item in &removed {
            self.pending_deletes.remove(&item.id);
        }

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "clear bought failed, re-syncing");
                match self.store.get_items(self.list.id).await {
                    Ok(items) => self.apply(ChangeEvent::BulkReplaced(items)),
                    Err(fetch_err) => {
                        warn!(error = %fetch_err, "re-sync failed, restoring locally");
                        for item in removed {
                            self.apply(ChangeEvent::ItemUpserted(item));
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Apply a full new order, optimistically
    ///
    /// `sequence` is the complete item order as resolved by the rendering
    /// collaborator's drag gesture. Rejected unless the active filter is
    /// `all`: a partial-sequence move cannot be mapped unambiguously onto
    /// the full order.
    pub async fn reorder(&mut self, sequence: &[Uuid]) -> StoreResult<()> {
        if self.filter != Filter::All {
            return Err(StoreError::Validation(
                "reordering requires the all view".to_string(),
            ));
        }

        let prior: Vec<(Uuid, i64)> = self.items.iter().map(|i| (i.id, i.sort_order)).collect();
        order::reassign(&mut self.items, sequence);
        order::sort_canonical(&mut self.items);

        // One batched request for the whole order, never N per-item calls
        match self.store.reorder(self.list.id, sequence).await {
            Ok(()) => {
                // Confirmation is a bulk refetch; if it fails the
                // optimistic ranks are already consistent, so keep them.
                match self.store.get_items(self.list.id).await {
                    Ok(items) => self.apply(ChangeEvent::BulkReplaced(items)),
                    Err(e) => warn!(error = %e, "reorder refetch failed"),
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "reorder failed, reverting");
                for (id, sort_order) in prior {
                    if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
                        item.sort_order = sort_order;
                    }
                }
                order::sort_canonical(&mut self.items);
                Err(e)
            }
        }
    }

    /// Relocate one item to `to` within the current order
    pub async fn move_item(&mut self, item_id: Uuid, to: usize) -> StoreResult<()> {
        if self.filter != Filter::All {
            return Err(StoreError::Validation(
                "reordering requires the all view".to_string(),
            ));
        }
        if !self.items.iter().any(|i| i.id == item_id) {
            return Err(StoreError::NotFound);
        }

        let current: Vec<Uuid> = self.items.iter().map(|i| i.id).collect();
        let sequence = order::relocate(&current, item_id, to);
        self.reorder(&sequence).await
    }
}
