// ── Keyed item storage shared by tables and projections ──
//
// `DashMap` for O(1) concurrent lookups, a `watch` version counter for
// async consumers, and the callback registry. No map guard outlives a
// mutation: subscribers are signalled after the write completes.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use super::subscription::{ItemCallback, ItemEvent, SubscriptionHandle, Subscriptions};

pub(crate) struct ItemStore<T: Send + Sync + 'static> {
    items: DashMap<String, Arc<T>>,
    subscriptions: Subscriptions,
    version: watch::Sender<u64>,
}

impl<T: Send + Sync + 'static> ItemStore<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            items: DashMap::new(),
            subscriptions: Subscriptions::new(),
            version,
        }
    }

    /// Insert or replace `id`, then signal `Added` or `Changed`.
    pub(crate) fn put(&self, id: String, item: T) -> ItemEvent {
        let previous = self.items.insert(id.clone(), Arc::new(item));
        let event = if previous.is_some() {
            ItemEvent::Changed
        } else {
            ItemEvent::Added
        };
        self.bump_version();
        self.subscriptions.signal(event, &id);
        event
    }

    /// Remove `id`, then signal `Deleted` if it was present.
    pub(crate) fn delete(&self, id: &str) -> Option<Arc<T>> {
        let (_, removed) = self.items.remove(id)?;
        self.bump_version();
        self.subscriptions.signal(ItemEvent::Deleted, id);
        Some(removed)
    }

    /// Replace `id` in place with `update` applied to a copy, then signal
    /// `Changed`. Returns `false` if `id` is absent.
    pub(crate) fn modify(&self, id: &str, update: impl FnOnce(&mut T)) -> bool
    where
        T: Clone,
    {
        {
            let Some(mut entry) = self.items.get_mut(id) else {
                return false;
            };
            update(Arc::make_mut(entry.value_mut()));
        }
        self.bump_version();
        self.subscriptions.signal(ItemEvent::Changed, id);
        true
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub(crate) fn get(&self, id: &str) -> Option<Arc<T>> {
        self.items.get(id).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.items.iter().map(|r| r.key().clone()).collect()
    }

    pub(crate) fn values(&self) -> Vec<Arc<T>> {
        self.items.iter().map(|r| Arc::clone(r.value())).collect()
    }

    pub(crate) fn items(&self) -> Vec<(String, Arc<T>)> {
        self.items
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub(crate) fn subscribe(
        &self,
        callback: ItemCallback,
        events: Option<&[ItemEvent]>,
        id_filter: Option<&str>,
    ) -> SubscriptionHandle {
        self.subscriptions.subscribe(callback, events, id_filter)
    }

    pub(crate) fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        self.subscriptions.unsubscribe(handle)
    }

    pub(crate) fn clear_subscriptions(&self) {
        self.subscriptions.clear();
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn put_reports_added_then_changed() {
        let store: ItemStore<String> = ItemStore::new();
        assert_eq!(store.put("a".into(), "x".into()), ItemEvent::Added);
        assert_eq!(store.put("a".into(), "y".into()), ItemEvent::Changed);
        assert_eq!(*store.get("a").unwrap(), "y");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_missing_is_none() {
        let store: ItemStore<String> = ItemStore::new();
        assert!(store.delete("nope").is_none());
        assert_eq!(*store.changes().borrow(), 0);
    }

    #[test]
    fn modify_keeps_old_snapshot_for_readers() {
        let store: ItemStore<String> = ItemStore::new();
        store.put("a".into(), "x".into());
        let before = store.get("a").unwrap();

        assert!(store.modify("a", |s| s.push('!')));
        assert_eq!(*before, "x");
        assert_eq!(*store.get("a").unwrap(), "x!");
        assert!(!store.modify("b", |s| s.push('!')));
    }

    #[test]
    fn every_mutation_bumps_version() {
        let store: ItemStore<String> = ItemStore::new();
        let rx = store.changes();
        store.put("a".into(), "x".into());
        store.modify("a", |s| s.clear());
        store.delete("a");
        assert_eq!(*rx.borrow(), 3);
    }
}
