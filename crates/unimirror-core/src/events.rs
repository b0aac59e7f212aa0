// ── Event classification ──
//
// `events` messages carry controller domain events. The classifier turns
// each one into an `Event`, tells its own subscribers, then offers it to
// every registered sink (entity tables that merge event-sourced state).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use tracing::trace;

use crate::messages::{Message, MessageKey, MessageRouter};
use crate::model::{Event, EventKey};
use crate::store::{EventSink, SubscriptionId};

type EventCallback = Arc<dyn Fn(&Arc<Event>) + Send + Sync>;

struct EventSubscriber {
    id: SubscriptionId,
    filter: Option<Vec<EventKey>>,
    callback: EventCallback,
}

#[derive(Default)]
struct Registry {
    sinks: ArcSwap<Vec<Arc<dyn EventSink>>>,
    subscribers: ArcSwap<Vec<Arc<EventSubscriber>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn handle(&self, message: &Message) {
        let Some(raw) = message.data.as_object() else {
            trace!("skipping non-object event");
            return;
        };
        let event = Arc::new(Event::new(raw.clone()));
        if event.key() == EventKey::Unknown {
            trace!(key = event.key_str(), "unrecognized event key");
        }

        let subscribers = self.subscribers.load_full();
        for subscriber in subscribers.iter() {
            let wanted = subscriber
                .filter
                .as_ref()
                .is_none_or(|keys| keys.contains(&event.key()));
            if wanted {
                (subscriber.callback)(&event);
            }
        }

        let sinks = self.sinks.load_full();
        let mut merged = 0usize;
        for sink in sinks.iter() {
            if sink.process_event(&event) {
                merged += 1;
            }
        }
        if merged == 0 {
            trace!(key = event.key_str(), mac = event.mac(), "event matched no entity");
        }
    }
}

/// Router subscriber that classifies `events` messages.
pub struct EventClassifier {
    registry: Arc<Registry>,
    router: std::sync::Weak<MessageRouter>,
    router_subscription: SubscriptionId,
}

impl EventClassifier {
    /// Subscribe to `router` for event messages only.
    pub fn attach(router: &Arc<MessageRouter>) -> Self {
        let registry = Arc::new(Registry::default());
        let weak = Arc::downgrade(&registry);
        let router_subscription = router.subscribe(
            move |message| {
                if let Some(registry) = weak.upgrade() {
                    registry.handle(message);
                }
            },
            Some(&[MessageKey::Event]),
        );
        Self {
            registry,
            router: Arc::downgrade(router),
            router_subscription,
        }
    }

    /// Offer future events to `sink`. Sinks with no events of interest are
    /// not registered; returns whether `sink` was added.
    pub fn register_sink(&self, sink: Arc<dyn EventSink>) -> bool {
        if sink.events_of_interest().is_empty() {
            return false;
        }
        self.registry.sinks.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&sink));
            next
        });
        true
    }

    pub fn sink_count(&self) -> usize {
        self.registry.sinks.load().len()
    }

    /// Receive every event whose key is in `filter`, or all events
    /// (including `Unknown`) when `filter` is `None`.
    pub fn subscribe<F>(&self, callback: F, filter: Option<&[EventKey]>) -> SubscriptionId
    where
        F: Fn(&Arc<Event>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(EventSubscriber {
            id,
            filter: filter.map(<[EventKey]>::to_vec),
            callback: Arc::new(callback),
        });
        self.registry.subscribers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&subscriber));
            next
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.registry.subscribers.rcu(|current| {
            let next: Vec<_> = current.iter().filter(|s| s.id != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    /// Stop listening to the router.
    pub fn detach(&self) -> bool {
        self.router
            .upgrade()
            .is_some_and(|router| router.unsubscribe(self.router_subscription))
    }
}

impl Drop for EventClassifier {
    fn drop(&mut self) {
        self.detach();
    }
}
