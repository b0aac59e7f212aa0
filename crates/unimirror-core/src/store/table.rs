// ── Generic entity table ──
//
// One instance per resource type. Merges HTTP snapshots and websocket
// messages into `id -> entity` state and tells subscribers what changed.

use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::sync::watch;
use tracing::trace;

use super::items::ItemStore;
use super::subscription::{ItemEvent, SubscriptionHandle};
use crate::messages::{Message, MessageKey, MessageRouter};
use crate::model::{ApiItem, Event, EventKey, RawItem, item_id};
use crate::store::SubscriptionId;

/// How a table keys items and which websocket traffic it reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Payload key holding each item's identity.
    pub obj_id_key: String,
    /// Message kinds whose data is upserted.
    pub upsert_messages: Vec<MessageKey>,
    /// Message kinds whose data is removed.
    pub remove_messages: Vec<MessageKey>,
    /// Domain events merged into existing items.
    pub events: Vec<EventKey>,
}

impl TableConfig {
    /// The configuration declared by `T`'s [`ApiItem`] constants.
    pub fn of<T: ApiItem>() -> Self {
        Self {
            obj_id_key: T::OBJ_ID_KEY.to_owned(),
            upsert_messages: T::UPSERT_MESSAGES.to_vec(),
            remove_messages: T::REMOVE_MESSAGES.to_vec(),
            events: T::EVENTS.to_vec(),
        }
    }

    /// Every message kind the table handles.
    pub fn message_kinds(&self) -> Vec<MessageKey> {
        self.upsert_messages
            .iter()
            .chain(&self.remove_messages)
            .copied()
            .collect()
    }
}

/// Something that can absorb domain events.
pub trait EventSink: Send + Sync {
    /// Event kinds this sink merges. Empty means it takes none.
    fn events_of_interest(&self) -> &[EventKey];

    /// Merge `event` into the entity it names. `false` if nothing matched.
    fn process_event(&self, event: &Arc<Event>) -> bool;
}

/// In-memory mirror of one controller resource.
///
/// - [`full_refresh`](Self::full_refresh) merges a snapshot; items missing
///   from it are kept.
/// - [`process_message`](Self::process_message) applies one websocket item.
/// - Items without the identity key are skipped silently.
/// - Subscribers run synchronously after each mutation, with no lock held.
///   A panicking subscriber unwinds into the caller.
pub struct EntityTable<T: ApiItem> {
    store: ItemStore<T>,
    config: TableConfig,
}

impl<T: ApiItem> EntityTable<T> {
    pub fn new() -> Self {
        Self::with_config(TableConfig::of::<T>())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self {
            store: ItemStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Upsert every object in `raw_list`. Nothing is removed.
    pub fn full_refresh<I>(&self, raw_list: I)
    where
        I: IntoIterator<Item = Value>,
    {
        for value in raw_list {
            match value {
                Value::Object(raw) => {
                    self.upsert(raw);
                }
                other => trace!(kind = json_kind(&other), "skipping non-object item"),
            }
        }
    }

    /// Insert or replace one item. `None` when it has no identity.
    pub fn upsert(&self, raw: RawItem) -> Option<ItemEvent> {
        let Some(id) = item_id(&raw, &self.config.obj_id_key) else {
            trace!(key = %self.config.obj_id_key, "skipping item without identity");
            return None;
        };
        Some(self.store.put(id, T::from_raw(raw)))
    }

    /// Remove one item, returning it if it was present.
    pub fn remove(&self, id: &str) -> Option<Arc<T>> {
        self.store.delete(id)
    }

    /// Apply a websocket message. Returns the resulting event, if any.
    pub fn process_message(&self, message: &Message) -> Option<ItemEvent> {
        let key = message.key();
        let Some(raw) = message.data.as_object() else {
            trace!(message = %message.meta.raw_message, "skipping non-object data");
            return None;
        };

        if self.config.upsert_messages.contains(&key) {
            return self.upsert(raw.clone());
        }
        if self.config.remove_messages.contains(&key) {
            let id = item_id(raw, &self.config.obj_id_key)?;
            return self.remove(&id).map(|_| ItemEvent::Deleted);
        }
        None
    }

    /// Route this table's message kinds from `router` into
    /// [`process_message`](Self::process_message).
    ///
    /// Returns `None` for snapshot-only tables. The router holds only a
    /// weak reference; dropping the table stops the forwarding.
    pub fn attach(self: &Arc<Self>, router: &MessageRouter) -> Option<SubscriptionId> {
        let kinds = self.config.message_kinds();
        if kinds.is_empty() {
            return None;
        }
        let table: Weak<Self> = Arc::downgrade(self);
        Some(router.subscribe(
            move |message| {
                if let Some(table) = table.upgrade() {
                    table.process_message(message);
                }
            },
            Some(&kinds),
        ))
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.store.ids()
    }

    pub fn values(&self) -> Vec<Arc<T>> {
        self.store.values()
    }

    pub fn items(&self) -> Vec<(String, Arc<T>)> {
        self.store.items()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Version counter bumped on every mutation.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.store.changes()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Call `callback(event, id)` for matching mutations.
    ///
    /// `events` limits the event kinds and `id_filter` limits the item;
    /// `None` means no restriction.
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

    /// Drop a subscription. Unsubscribing twice is a no-op returning `false`.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        self.store.unsubscribe(handle)
    }

    pub fn clear_subscriptions(&self) {
        self.store.clear_subscriptions();
    }

    pub fn subscription_count(&self) -> usize {
        self.store.subscription_count()
    }
}

impl<T: ApiItem> Default for EntityTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ApiItem> EventSink for EntityTable<T> {
    fn events_of_interest(&self) -> &[EventKey] {
        &self.config.events
    }

    fn process_event(&self, event: &Arc<Event>) -> bool {
        if !self.config.events.contains(&event.key()) || event.mac().is_empty() {
            return false;
        }
        self.store
            .modify(event.mac(), |item| item.apply_event(event))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::messages::Meta;
    use crate::model::{Client, Site};

    type Log = Arc<Mutex<Vec<(ItemEvent, String)>>>;

    fn record<T: ApiItem>(
        table: &EntityTable<T>,
        events: Option<&[ItemEvent]>,
        id_filter: Option<&str>,
    ) -> Log {
        let log: Log = Arc::default();
        let sink = Arc::clone(&log);
        table.subscribe(
            move |event, id| sink.lock().unwrap().push((event, id.to_owned())),
            events,
            id_filter,
        );
        log
    }

    fn message(tag: &str, data: Value) -> Message {
        Message {
            meta: Arc::new(Meta {
                rc: "ok".into(),
                message: MessageKey::parse(tag),
                raw_message: tag.into(),
            }),
            data,
        }
    }

    fn added(id: &str) -> (ItemEvent, String) {
        (ItemEvent::Added, id.to_owned())
    }

    fn changed(id: &str) -> (ItemEvent, String) {
        (ItemEvent::Changed, id.to_owned())
    }

    fn deleted(id: &str) -> (ItemEvent, String) {
        (ItemEvent::Deleted, id.to_owned())
    }

    #[test]
    fn full_refresh_twice_is_added_then_changed() {
        let table: EntityTable<Client> = EntityTable::new();
        let log = record(&table, None, None);
        let snapshot = vec![
            json!({ "mac": "aa:01", "name": "a" }),
            json!({ "mac": "aa:02", "name": "b" }),
            json!({ "mac": "aa:01", "name": "a2" }),
        ];

        table.full_refresh(snapshot.clone());
        table.full_refresh(snapshot);

        assert_eq!(table.len(), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                added("aa:01"),
                added("aa:02"),
                changed("aa:01"),
                changed("aa:01"),
                changed("aa:02"),
                changed("aa:01"),
            ]
        );
    }

    #[test]
    fn full_refresh_is_additive() {
        let table: EntityTable<Client> = EntityTable::new();
        table.full_refresh(vec![json!({ "mac": "aa:01" }), json!({ "mac": "aa:02" })]);
        table.full_refresh(vec![json!({ "mac": "aa:02" })]);
        assert!(table.contains("aa:01"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn items_without_identity_are_skipped() {
        let table: EntityTable<Client> = EntityTable::new();
        let log = record(&table, None, None);
        table.full_refresh(vec![
            json!({ "name": "no mac" }),
            json!({ "mac": null }),
            json!("not an object"),
            json!({ "mac": "aa:01" }),
        ]);
        assert_eq!(table.ids(), vec!["aa:01".to_owned()]);
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(
            table.process_message(&message("sta:sync", json!({ "hostname": "x" }))),
            None
        );
    }

    #[test]
    fn upsert_then_remove_round_trip() {
        let table: EntityTable<Client> = EntityTable::new();
        let log = record(&table, None, None);

        let upserted = table.process_message(&message("sta:sync", json!({ "mac": "X", "ip": "10.0.0.2" })));
        let removed = table.process_message(&message("user:delete", json!({ "mac": "X" })));

        assert_eq!(upserted, Some(ItemEvent::Added));
        assert_eq!(removed, Some(ItemEvent::Deleted));
        assert!(!table.contains("X"));
        assert_eq!(*log.lock().unwrap(), vec![added("X"), deleted("X")]);
    }

    #[test]
    fn removing_absent_item_fires_nothing() {
        let table: EntityTable<Client> = EntityTable::new();
        let log = record(&table, None, None);
        assert_eq!(
            table.process_message(&message("user:delete", json!({ "mac": "X" }))),
            None
        );
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn unrelated_messages_are_ignored() {
        let table: EntityTable<Client> = EntityTable::new();
        assert_eq!(
            table.process_message(&message("device:sync", json!({ "mac": "X" }))),
            None
        );
        assert_eq!(
            table.process_message(&message("mystery:kind", json!({ "mac": "X" }))),
            None
        );
        assert!(table.is_empty());
    }

    #[test]
    fn snapshot_then_message_replaces_payload() {
        let table: EntityTable<Client> = EntityTable::new();
        table.full_refresh(vec![json!({ "mac": "aa:bb", "name": "x" })]);
        assert_eq!(table.get("aa:bb").unwrap().name(), "x");

        let log = record(&table, None, None);
        table.process_message(&message("sta:sync", json!({ "mac": "aa:bb", "name": "y" })));

        assert_eq!(table.get("aa:bb").unwrap().name(), "y");
        assert_eq!(*log.lock().unwrap(), vec![changed("aa:bb")]);
    }

    #[test]
    fn filters_select_subscribers() {
        let table: EntityTable<Client> = EntityTable::new();
        let all = record(&table, None, None);
        let only_added = record(&table, Some(&[ItemEvent::Added]), None);
        let only_x = record(&table, None, Some("X"));

        table.upsert(json!({ "mac": "X" }).as_object().unwrap().clone());
        table.upsert(json!({ "mac": "X" }).as_object().unwrap().clone());

        assert_eq!(*all.lock().unwrap(), vec![added("X"), changed("X")]);
        assert_eq!(*only_added.lock().unwrap(), vec![added("X")]);
        assert_eq!(*only_x.lock().unwrap(), vec![added("X"), changed("X")]);
    }

    #[test]
    fn id_filter_ignores_other_items() {
        let table: EntityTable<Client> = EntityTable::new();
        let only_x = record(&table, None, Some("X"));
        table.full_refresh(vec![json!({ "mac": "Y" })]);
        assert!(only_x.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribe_twice_and_after_clear() {
        let table: EntityTable<Client> = EntityTable::new();
        let handle = table.subscribe(|_, _| {}, None, None);
        assert!(table.unsubscribe(&handle));
        assert!(!table.unsubscribe(&handle));

        let handle = table.subscribe(|_, _| {}, None, Some("X"));
        table.clear_subscriptions();
        assert!(!table.unsubscribe(&handle));
        assert_eq!(table.subscription_count(), 0);
    }

    #[test]
    fn delete_then_readd_is_a_fresh_add() {
        let table: EntityTable<Client> = EntityTable::new();
        table.full_refresh(vec![json!({ "mac": "X" })]);
        table.remove("X");
        let log = record(&table, None, None);
        table.full_refresh(vec![json!({ "mac": "X" })]);
        assert_eq!(*log.lock().unwrap(), vec![added("X")]);
    }

    #[test]
    fn numeric_identity_is_stringified() {
        let table: EntityTable<Site> = EntityTable::with_config(TableConfig {
            obj_id_key: "seq".into(),
            ..TableConfig::of::<Site>()
        });
        table.full_refresh(vec![json!({ "seq": 42, "name": "default" })]);
        assert!(table.contains("42"));
    }

    #[test]
    fn callback_can_read_the_table() {
        let table = Arc::new(EntityTable::<Client>::new());
        let seen = Arc::new(Mutex::new(None));
        let (weak, sink) = (Arc::downgrade(&table), Arc::clone(&seen));
        table.subscribe(
            move |_, id| {
                let name = weak.upgrade().unwrap().get(id).unwrap().name().to_owned();
                *sink.lock().unwrap() = Some(name);
            },
            None,
            None,
        );
        table.full_refresh(vec![json!({ "mac": "X", "name": "laptop" })]);
        assert_eq!(seen.lock().unwrap().as_deref(), Some("laptop"));
    }

    #[test]
    #[should_panic(expected = "subscriber failed")]
    fn subscriber_panic_propagates() {
        let table: EntityTable<Client> = EntityTable::new();
        table.subscribe(|_, _| panic!("subscriber failed"), None, None);
        table.full_refresh(vec![json!({ "mac": "X" })]);
    }

    #[test]
    fn attach_routes_only_table_kinds() {
        let router = MessageRouter::new();
        let table = Arc::new(EntityTable::<Client>::new());
        assert!(table.attach(&router).is_some());

        router.dispatch(&json!({
            "meta": { "message": "sta:sync" },
            "data": [{ "mac": "a" }, { "mac": "b" }]
        }));
        router.dispatch(&json!({ "meta": { "message": "device:sync" }, "data": [{ "mac": "c" }] }));
        router.dispatch(&json!({ "meta": { "message": "user:delete" }, "data": [{ "mac": "a" }] }));

        assert_eq!(table.ids(), vec!["b".to_owned()]);
    }

    #[test]
    fn snapshot_only_tables_do_not_attach() {
        let router = MessageRouter::new();
        let sites = Arc::new(EntityTable::<Site>::new());
        assert!(sites.attach(&router).is_none());
        assert_eq!(router.subscriber_count(), 0);
    }

    #[test]
    fn changes_counts_mutations() {
        let table: EntityTable<Client> = EntityTable::new();
        let rx = table.changes();
        table.full_refresh(vec![json!({ "mac": "a" }), json!({ "mac": "b" })]);
        table.remove("a");
        assert_eq!(*rx.borrow(), 3);
    }
}
