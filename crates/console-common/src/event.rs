//! Console events and the synchronous publish/subscribe registry.

use std::sync::RwLock;

use crate::layer::LayerId;

/// Events published by the console for decoupled observers (persistence,
/// logging, the embedding shell).
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    /// A style was selected for a layer; empty value means the default style.
    StyleSelected { layer: LayerId, style: String },
    /// An output format was selected for a layer.
    FormatSelected { layer: LayerId, format: String },
    /// The capability descriptor for a layer became available.
    CapabilityArrived { layer: LayerId },
    /// A layer's action menu materialized.
    MenuReady { layer: LayerId },
    /// The user asked to open a layer's metadata document.
    MetadataRequested { layer: LayerId, url: String },
    /// Edit mode was switched on or off for a layer.
    EditStateChanged { layer: LayerId, active: bool },
}

type Subscriber = Box<dyn Fn(&ConsoleEvent) + Send + Sync>;

/// Explicit publish/subscribe registry.
///
/// Delivery is synchronous, in subscription order, on the publishing thread
/// of control. Subscribers must not subscribe from within a callback.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&ConsoleEvent) + Send + Sync + 'static,
    {
        self.subscribers
            .write()
            .expect("event bus lock poisoned")
            .push(Box::new(subscriber));
    }

    pub fn publish(&self, event: &ConsoleEvent) {
        let subscribers = self.subscribers.read().expect("event bus lock poisoned");
        for subscriber in subscribers.iter() {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("event bus lock poisoned")
            .len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
