use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use serde::Serialize;

use crate::decode::*;
use crate::models::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    ProductsReady,
    PurchaseUpdated,
    PurchaseError,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::ProductsReady,
        EventKind::PurchaseUpdated,
        EventKind::PurchaseError,
    ];

    /// Event name used by the native bridge.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ProductsReady => "products_ready",
            EventKind::PurchaseUpdated => "purchase_updated",
            EventKind::PurchaseError => "purchase_error",
        }
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum IapEvent {
    ProductsReady(Vec<ProductDetails>),
    PurchaseUpdated(PurchaseEvent),
    PurchaseError(PurchaseError),
}

impl IapEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            IapEvent::ProductsReady(_) => EventKind::ProductsReady,
            IapEvent::PurchaseUpdated(_) => EventKind::PurchaseUpdated,
            IapEvent::PurchaseError(_) => EventKind::PurchaseError,
        }
    }

    /// Decodes a raw notification. A payload that cannot be parsed at all
    /// becomes a `purchase_error` naming the event that was lost.
    pub fn decode(kind: EventKind, payload: &str) -> Self {
        let decoded = match kind {
            EventKind::ProductsReady => decode_products(payload).map(IapEvent::ProductsReady),
            EventKind::PurchaseUpdated => {
                decode_purchase_event(payload).map(IapEvent::PurchaseUpdated)
            }
            EventKind::PurchaseError => {
                return IapEvent::PurchaseError(decode_purchase_error(payload))
            }
        };
        decoded.unwrap_or_else(|err| {
            warn!("dropping {} notification: {err}", kind.name());
            IapEvent::PurchaseError(PurchaseError {
                message: format!("failed to decode {} event: {err}", kind.name()),
            })
        })
    }
}

pub type SubscriptionId = u64;

type Handler = Arc<dyn Fn(&IapEvent) + Send + Sync>;

/// Registered event handlers, keyed by the event kind they listen to.
#[derive(Default)]
pub struct Subscriptions {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<SubscriptionId, (EventKind, Handler)>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&IapEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (kind, Arc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|(k, _)| *k == kind)
    }

    /// Entry point for raw notifications from the bridge. Unknown event names
    /// are ignored.
    pub fn route(&self, name: &str, payload: &str) {
        let Ok(kind) = name.parse::<EventKind>() else {
            warn!("ignoring unknown bridge event {name:?}");
            return;
        };
        debug!("bridge event {name}");
        self.publish(&IapEvent::decode(kind, payload));
    }

    /// Calls every handler subscribed to the event's kind, in subscription
    /// order. Handlers run outside the lock so they may (un)subscribe.
    pub fn publish(&self, event: &IapEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }
}
