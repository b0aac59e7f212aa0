// ── Entity models ──
//
// Every mirrored entity is its raw controller payload plus typed accessors
// generated from a field table. The payload is replaced wholesale on every
// snapshot or upsert; nothing patches individual raw fields.

pub(crate) mod fields;

mod client;
mod device;
mod dpi;
mod event;
mod firewall;
mod outlet;
mod port;
mod port_forward;
mod site;
mod voucher;
mod wlan;

use std::sync::Arc;

use serde_json::Value;

use crate::messages::MessageKey;

pub use client::Client;
pub use device::Device;
pub use dpi::{DpiRestrictionApp, DpiRestrictionGroup};
pub use event::{Event, EventKey};
pub use fields::{FieldDefault, FieldSpec};
pub use firewall::FirewallRule;
pub use outlet::Outlet;
pub use port::Port;
pub use port_forward::PortForward;
pub use site::Site;
pub use voucher::Voucher;
pub use wlan::Wlan;

/// An opaque controller payload: one JSON object.
pub type RawItem = serde_json::Map<String, Value>;

/// Read the identity of `raw` under `key`.
///
/// Strings are used as-is and numbers are rendered in decimal. Any other
/// JSON type, like a missing key, means the item has no identity.
pub fn item_id(raw: &RawItem, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Where an entity's current state came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Source {
    /// A full refresh or an upsert message.
    #[default]
    Snapshot,
    /// A websocket event applied on top of the last snapshot.
    Event,
}

/// A controller entity held in an [`EntityTable`](crate::store::EntityTable).
///
/// The constants describe how the table keys items and which websocket
/// traffic it reacts to; an entity type with empty message lists is
/// refreshed from HTTP snapshots only.
pub trait ApiItem: Clone + Send + Sync + 'static {
    /// Payload key holding the entity's identity.
    const OBJ_ID_KEY: &'static str;

    /// Message kinds whose data items are upserted.
    const UPSERT_MESSAGES: &'static [MessageKey] = &[];

    /// Message kinds whose data items are removed.
    const REMOVE_MESSAGES: &'static [MessageKey] = &[];

    /// Domain events merged into existing entities.
    const EVENTS: &'static [EventKey] = &[];

    /// Wrap a raw payload.
    fn from_raw(raw: RawItem) -> Self;

    /// The raw payload this entity was built from.
    fn raw(&self) -> &RawItem;

    /// Merge an event-sourced update. The raw payload is left untouched.
    fn apply_event(&mut self, _event: &Arc<Event>) {}
}

/// A derived entity carved out of a nested list in its parent's payload.
pub trait SubItem: Clone + Send + Sync + 'static {
    /// Parent payload key holding the nested list.
    const LIST_KEY: &'static str;

    /// Element key holding the local index.
    const INDEX_KEY: &'static str;

    /// Element key used when the index is missing.
    const FALLBACK_KEY: Option<&'static str> = None;

    /// Wrap one nested element. `parent_id` is the owning entity's id.
    fn from_raw(parent_id: &str, raw: RawItem) -> Self;

    /// The raw element this sub-entity was built from.
    fn raw(&self) -> &RawItem;

    /// The local index of `raw`: the index key, else the fallback key.
    fn sub_index(raw: &RawItem) -> Option<String> {
        item_id(raw, Self::INDEX_KEY).or_else(|| Self::FALLBACK_KEY.and_then(|key| item_id(raw, key)))
    }
}
