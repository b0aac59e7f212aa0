// ── Derived sub-entity tables ──
//
// Ports and outlets have no identity of their own on the controller: they
// live in a nested list of their parent device's payload. A `DerivedTable`
// follows the parent table's add/change/delete stream and keeps one entry
// per nested element under `{parent_id}_{sub_index}`.

use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tokio::sync::watch;
use tracing::trace;

use super::items::ItemStore;
use super::subscription::{ItemEvent, SubscriptionHandle};
use super::table::EntityTable;
use crate::model::{ApiItem, Device, RawItem, SubItem};

/// A reactive projection of `S` items out of a parent `P` table.
///
/// Parent `Added`/`Changed` re-reads the parent's current payload and
/// overwrites every derived entry it yields. Entries for elements that
/// disappeared from the nested list are kept until the parent is deleted.
/// Parent `Deleted` drops every entry whose id starts with the parent id.
pub struct DerivedTable<S: SubItem, P: ApiItem = Device> {
    store: Arc<ItemStore<S>>,
    parent: Weak<EntityTable<P>>,
    parent_subscription: Mutex<Option<SubscriptionHandle>>,
}

impl<S: SubItem, P: ApiItem> DerivedTable<S, P> {
    /// Build the projection and subscribe it to `parent`.
    ///
    /// Items already in the parent are not projected until they change;
    /// attach before the first refresh.
    pub fn attach(parent: &Arc<EntityTable<P>>) -> Self {
        let store = Arc::new(ItemStore::new());
        let weak_store = Arc::downgrade(&store);
        let weak_parent = Arc::downgrade(parent);

        let handle = parent.subscribe(
            move |event, parent_id| {
                let Some(store) = weak_store.upgrade() else {
                    return;
                };
                match event {
                    ItemEvent::Added | ItemEvent::Changed => {
                        if let Some(parent) = weak_parent.upgrade().and_then(|p| p.get(parent_id)) {
                            project::<S>(&store, parent_id, parent.raw());
                        }
                    }
                    ItemEvent::Deleted => drop_children(&store, parent_id),
                }
            },
            None,
            None,
        );

        Self {
            store,
            parent: Arc::downgrade(parent),
            parent_subscription: Mutex::new(Some(handle)),
        }
    }

    /// Stop following the parent. Existing entries are kept.
    /// Returns `false` if already detached.
    pub fn detach(&self) -> bool {
        let handle = self
            .parent_subscription
            .lock()
            .map(|mut guard| guard.take())
            .unwrap_or_default();
        match (handle, self.parent.upgrade()) {
            (Some(handle), Some(parent)) => parent.unsubscribe(&handle),
            _ => false,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<Arc<S>> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.store.ids()
    }

    pub fn values(&self) -> Vec<Arc<S>> {
        self.store.values()
    }

    pub fn items(&self) -> Vec<(String, Arc<S>)> {
        self.store.items()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn changes(&self) -> watch::Receiver<u64> {
        self.store.changes()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe<F>(
        &self,
        callback: F,
        events: Option<&[ItemEvent]>,
        id_filter: Option<&str>,
    ) -> SubscriptionHandle
    where
        F: Fn(ItemEvent, &str) + Send + Sync + 'static,
    {
        self.store.subscribe(Arc::new(callback), events, id_filter)
    }

    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        self.store.unsubscribe(handle)
    }

    pub fn clear_subscriptions(&self) {
        self.store.clear_subscriptions();
    }
}

impl<S: SubItem, P: ApiItem> Drop for DerivedTable<S, P> {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Overwrite every entry derived from `parent_raw`.
fn project<S: SubItem>(store: &ItemStore<S>, parent_id: &str, parent_raw: &RawItem) {
    let Some(list) = parent_raw.get(S::LIST_KEY).and_then(Value::as_array) else {
        return;
    };
    for element in list {
        let Some(raw) = element.as_object() else {
            trace!(parent = parent_id, list = S::LIST_KEY, "skipping non-object element");
            continue;
        };
        let Some(sub_index) = S::sub_index(raw) else {
            trace!(parent = parent_id, list = S::LIST_KEY, "skipping element without index");
            continue;
        };
        let id = format!("{parent_id}_{sub_index}");
        store.put(id, S::from_raw(parent_id, raw.clone()));
    }
}

/// Remove every entry whose id starts with `parent_id`.
fn drop_children<S: SubItem>(store: &ItemStore<S>, parent_id: &str) {
    // Collect first: deleting while iterating would deadlock the shard.
    let doomed: Vec<String> = store
        .ids()
        .into_iter()
        .filter(|id| id.starts_with(parent_id))
        .collect();
    for id in doomed {
        store.delete(&id);
    }
}
