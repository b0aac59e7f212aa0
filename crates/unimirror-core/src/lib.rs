//! Live in-memory mirror of a UniFi controller site.
//!
//! The mirror is built from two inputs: full REST snapshots and the
//! controller's websocket message stream. Both land in the same tables.
//!
//! - **[`Controller`]**: connection lifecycle. [`connect()`](Controller::connect)
//!   logs in, loads every resource, then bridges websocket frames into the
//!   store and refreshes periodically.
//!
//! - **[`DataStore`]**: one [`EntityTable`] per resource, keyed by the
//!   resource's id field, plus the derived port and outlet tables.
//!
//! - **[`MessageRouter`]**: decodes `{ meta, data }` frames and delivers
//!   them to subscribers filtered by [`MessageKey`].
//!
//! - **[`EventClassifier`]**: turns `events` messages into typed [`Event`]s
//!   and forwards them to the client and device tables.
//!
//! Consumers observe changes with per-item or table-wide subscriptions
//! ([`EntityTable::subscribe`]) that report [`ItemEvent::Added`],
//! [`ItemEvent::Changed`] or [`ItemEvent::Deleted`] with the item id.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod messages;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControllerConfig, ReconnectConfig, TlsVerification};
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use events::EventClassifier;
pub use messages::{Message, MessageKey, MessageRouter, Meta};
pub use store::{
    DataStore, DerivedTable, EntityTable, EventSink, ItemEvent, SubscriptionHandle,
    SubscriptionId, TableConfig,
};

pub use model::{
    ApiItem, Client, Device, DpiRestrictionApp, DpiRestrictionGroup, Event, EventKey,
    FirewallRule, Outlet, Port, PortForward, RawItem, Site, Source, SubItem, Voucher, Wlan,
};
