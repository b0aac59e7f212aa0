// ── Item subscriptions ──
//
// Callbacks are bucketed by id filter (`None` = every id). Signalling an
// item collects the matching callbacks from its own bucket and the
// wildcard bucket, releases every map guard, and only then calls out, so
// callbacks may freely read or mutate the table that notified them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// What happened to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ItemEvent {
    Added,
    Changed,
    Deleted,
}

/// Opaque id of a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Token returned by `subscribe`; redeem it with `unsubscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    bucket: Option<String>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

pub(crate) type ItemCallback = Arc<dyn Fn(ItemEvent, &str) + Send + Sync>;

struct Entry {
    id: SubscriptionId,
    events: Option<Vec<ItemEvent>>,
    callback: ItemCallback,
}

/// Subscriber registry of one table.
pub(crate) struct Subscriptions {
    buckets: DashMap<Option<String>, Vec<Entry>>,
    next_id: AtomicU64,
}

impl Subscriptions {
    pub(crate) fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn subscribe(
        &self,
        callback: ItemCallback,
        events: Option<&[ItemEvent]>,
        id_filter: Option<&str>,
    ) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let bucket = id_filter.map(str::to_owned);
        self.buckets.entry(bucket.clone()).or_default().push(Entry {
            id,
            events: events.map(<[ItemEvent]>::to_vec),
            callback,
        });
        SubscriptionHandle { id, bucket }
    }

    /// Drop a subscription. `false` if it no longer exists.
    pub(crate) fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let Some(mut bucket) = self.buckets.get_mut(&handle.bucket) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|entry| entry.id != handle.id);
        let removed = bucket.len() != before;
        let now_empty = bucket.is_empty();
        drop(bucket);

        if now_empty {
            self.buckets.remove_if(&handle.bucket, |_, entries| entries.is_empty());
        }
        removed
    }

    pub(crate) fn clear(&self) {
        self.buckets.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }

    /// Notify every subscriber interested in `event` for `id`: the id's own
    /// bucket first, then the wildcard bucket, each in subscription order.
    pub(crate) fn signal(&self, event: ItemEvent, id: &str) {
        let mut targets: Vec<ItemCallback> = Vec::new();
        let wanted = |entry: &&Entry| entry.events.as_ref().is_none_or(|e| e.contains(&event));

        if let Some(bucket) = self.buckets.get(&Some(id.to_owned())) {
            targets.extend(bucket.iter().filter(wanted).map(|e| Arc::clone(&e.callback)));
        }
        if let Some(bucket) = self.buckets.get(&None) {
            targets.extend(bucket.iter().filter(wanted).map(|e| Arc::clone(&e.callback)));
        }

        for callback in targets {
            callback(event, id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn counter() -> (Arc<Mutex<Vec<(ItemEvent, String)>>>, ItemCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ItemCallback = Arc::new(move |event, id: &str| {
            sink.lock().unwrap().push((event, id.to_owned()));
        });
        (seen, callback)
    }

    #[test]
    fn id_bucket_fires_before_wildcard() {
        let subs = Subscriptions::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        subs.subscribe(Arc::new(move |_, _| o.lock().unwrap().push("all")), None, None);
        let o = Arc::clone(&order);
        subs.subscribe(Arc::new(move |_, _| o.lock().unwrap().push("one")), None, Some("x"));

        subs.signal(ItemEvent::Added, "x");
        assert_eq!(*order.lock().unwrap(), vec!["one", "all"]);
    }

    #[test]
    fn other_ids_do_not_fire_id_filtered() {
        let subs = Subscriptions::new();
        let (seen, callback) = counter();
        subs.subscribe(callback, None, Some("x"));
        subs.signal(ItemEvent::Changed, "y");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn double_unsubscribe_is_noop() {
        let subs = Subscriptions::new();
        let (_, callback) = counter();
        let handle = subs.subscribe(callback, None, Some("x"));
        assert!(subs.unsubscribe(&handle));
        assert!(!subs.unsubscribe(&handle));
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn unsubscribe_after_clear_is_noop() {
        let subs = Subscriptions::new();
        let (_, callback) = counter();
        let handle = subs.subscribe(callback, Some(&[ItemEvent::Added]), None);
        subs.clear();
        assert!(!subs.unsubscribe(&handle));
    }

    #[test]
    fn unsubscribe_keeps_bucket_neighbours() {
        let subs = Subscriptions::new();
        let (seen, a) = counter();
        let (_, b) = counter();
        subs.subscribe(a, None, Some("x"));
        let handle = subs.subscribe(b, None, Some("x"));
        assert!(subs.unsubscribe(&handle));

        subs.signal(ItemEvent::Deleted, "x");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn callback_may_subscribe_reentrantly() {
        let subs = Arc::new(Subscriptions::new());
        let inner = Arc::clone(&subs);
        subs.subscribe(
            Arc::new(move |_, id: &str| {
                inner.subscribe(Arc::new(|_, _| {}), None, Some(id));
            }),
            None,
            None,
        );
        subs.signal(ItemEvent::Added, "x");
        assert_eq!(subs.len(), 2);
    }
}
