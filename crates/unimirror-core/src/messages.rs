// ── Websocket message decoding and routing ──
//
// A frame is `{"meta": {"message": tag, ...}, "data": [item, ...]}`. The
// decoder turns it into one `Message` per data item, all sharing the same
// `Meta`; the router hands each message to every subscriber whose tag
// filter matches, in subscription order.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use serde_json::Value;
use strum::{EnumString, IntoStaticStr};
use tracing::{debug, trace};

use crate::store::SubscriptionId;

/// Message kinds the controller sends over the websocket.
///
/// Unrecognized tags parse to [`MessageKey::Unknown`] so newer firmware
/// never breaks decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
pub enum MessageKey {
    #[strum(serialize = "sta:sync")]
    Client,
    #[strum(serialize = "user:delete")]
    ClientRemoved,
    #[strum(serialize = "device:sync")]
    Device,
    #[strum(serialize = "device:update")]
    DeviceUpdate,
    #[strum(serialize = "events")]
    Event,

    #[strum(serialize = "wlanconf:add")]
    WlanConfAdded,
    #[strum(serialize = "wlanconf:sync")]
    WlanConfUpdated,
    #[strum(serialize = "wlanconf:delete")]
    WlanConfDeleted,

    #[strum(serialize = "portforward:add")]
    PortForwardAdded,
    #[strum(serialize = "portforward:sync")]
    PortForwardUpdated,
    #[strum(serialize = "portforward:delete")]
    PortForwardDeleted,

    #[strum(serialize = "dpiapp:add")]
    DpiAppAdded,
    #[strum(serialize = "dpiapp:sync")]
    DpiAppUpdated,
    #[strum(serialize = "dpiapp:delete")]
    DpiAppDeleted,

    #[strum(serialize = "dpigroup:add")]
    DpiGroupAdded,
    #[strum(serialize = "dpigroup:sync")]
    DpiGroupUpdated,
    #[strum(serialize = "dpigroup:delete")]
    DpiGroupDeleted,

    #[strum(serialize = "firewallrule:add")]
    FirewallRuleAdded,
    #[strum(serialize = "firewallrule:sync")]
    FirewallRuleUpdated,
    #[strum(serialize = "firewallrule:delete")]
    FirewallRuleDeleted,

    #[strum(serialize = "speed-test:update")]
    SpeedTestUpdate,
    #[strum(serialize = "session-metadata:sync")]
    SessionMetadataSync,

    #[strum(serialize = "unknown")]
    Unknown,
}

impl MessageKey {
    /// Parse a message tag. Pure and total: unknown tags give `Unknown`.
    pub fn parse(tag: &str) -> Self {
        Self::from_str(tag).unwrap_or(Self::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Envelope metadata shared by every message decoded from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    /// Result code, usually `"ok"`. Empty when the frame carries none.
    pub rc: String,
    pub message: MessageKey,
    /// The tag as sent, kept for `Unknown` messages.
    pub raw_message: String,
}

/// One data item of a frame, tagged with the frame's metadata.
#[derive(Debug, Clone)]
pub struct Message {
    pub meta: Arc<Meta>,
    pub data: Value,
}

impl Message {
    pub fn key(&self) -> MessageKey {
        self.meta.message
    }
}

/// Split a frame into its metadata and data items.
///
/// Returns `None` when `meta` or `data` is missing, or `data` is not a list.
pub fn decode(frame: &Value) -> Option<(Arc<Meta>, Vec<Value>)> {
    let meta = frame.get("meta")?;
    let data = frame.get("data")?.as_array()?;

    let raw_message = meta
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let meta = Meta {
        rc: meta
            .get("rc")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        message: MessageKey::parse(&raw_message),
        raw_message,
    };

    Some((Arc::new(meta), data.clone()))
}

/// Parse a text frame and [`decode`] it.
pub fn decode_text(text: &str) -> Option<(Arc<Meta>, Vec<Value>)> {
    match serde_json::from_str::<Value>(text) {
        Ok(frame) => decode(&frame),
        Err(e) => {
            debug!(error = %e, "dropping unparseable frame");
            None
        }
    }
}

// ── Router ───────────────────────────────────────────────────────────

type MessageCallback = Arc<dyn Fn(&Message) + Send + Sync>;

struct RouterSubscriber {
    id: SubscriptionId,
    filter: Option<Vec<MessageKey>>,
    callback: MessageCallback,
}

impl RouterSubscriber {
    fn wants(&self, key: MessageKey) -> bool {
        self.filter.as_ref().is_none_or(|keys| keys.contains(&key))
    }
}

/// Fan-out point between the websocket and everything that mirrors it.
///
/// The subscriber list is a copy-on-write snapshot: callbacks may
/// subscribe or unsubscribe while a message is being dispatched, and the
/// change applies from the next message.
pub struct MessageRouter {
    subscribers: ArcSwap<Vec<Arc<RouterSubscriber>>>,
    next_id: AtomicU64,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            subscribers: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Receive every message whose kind is in `filter`, or every message
    /// when `filter` is `None`.
    pub fn subscribe<F>(&self, callback: F, filter: Option<&[MessageKey]>) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(RouterSubscriber {
            id,
            filter: filter.map(<[MessageKey]>::to_vec),
            callback: Arc::new(callback),
        });
        self.subscribers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&subscriber));
            next
        });
        id
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.subscribers.rcu(|current| {
            let next: Vec<_> = current.iter().filter(|s| s.id != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load().len()
    }

    /// Decode `frame` and deliver each message, in data order, to every
    /// matching subscriber. Returns the number of messages dispatched.
    ///
    /// Frames without `meta` or `data` are dropped. A panicking subscriber
    /// unwinds out of this call; the router holds no lock while calling out.
    pub fn dispatch(&self, frame: &Value) -> usize {
        let Some((meta, data)) = decode(frame) else {
            debug!("dropping frame without meta/data");
            return 0;
        };

        if meta.message == MessageKey::Unknown {
            trace!(tag = %meta.raw_message, "dispatching unknown message kind");
        }

        let count = data.len();
        for item in data {
            let message = Message {
                meta: Arc::clone(&meta),
                data: item,
            };
            let subscribers = self.subscribers.load_full();
            for subscriber in subscribers.iter().filter(|s| s.wants(meta.message)) {
                (subscriber.callback)(&message);
            }
        }
        count
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}
