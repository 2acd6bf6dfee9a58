//! Capability descriptor caching.
//!
//! Stores the capability metadata already fetched per layer. Written by the
//! fetch path exactly once per layer; read synchronously by menu builders.
//! Every insert bumps a change epoch observable through a watch channel,
//! which is what parked ready-gates wake on.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::watch;
use tracing::{debug, warn};

use console_common::{CapabilityDescriptor, LayerId};

/// Cache of capability descriptors keyed by layer identity.
pub struct CapabilityCache {
    entries: RwLock<HashMap<LayerId, CapabilityDescriptor>>,
    epoch: watch::Sender<u64>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        let (epoch, _) = watch::channel(0);
        Self {
            entries: RwLock::new(HashMap::new()),
            epoch,
        }
    }

    /// Store a descriptor for a layer. A layer is described exactly once:
    /// a second insert for the same identity is rejected.
    pub fn insert(&self, id: LayerId, mut descriptor: CapabilityDescriptor) -> bool {
        {
            let mut entries = self.entries.write().expect("capability cache poisoned");
            if entries.contains_key(&id) {
                warn!(layer = %id, "Rejected second capability insert");
                return false;
            }
            descriptor.described = true;
            entries.insert(id.clone(), descriptor);
        }
        self.epoch.send_modify(|epoch| *epoch += 1);
        debug!(layer = %id, "Capability descriptor cached");
        true
    }

    /// Fetch a clone of the descriptor, if described.
    pub fn get(&self, id: &LayerId) -> Option<CapabilityDescriptor> {
        self.entries
            .read()
            .expect("capability cache poisoned")
            .get(id)
            .cloned()
    }

    pub fn is_described(&self, id: &LayerId) -> bool {
        self.entries
            .read()
            .expect("capability cache poisoned")
            .contains_key(id)
    }

    /// Drop the entry for a removed layer. Idempotent.
    pub fn evict(&self, id: &LayerId) -> bool {
        let removed = self
            .entries
            .write()
            .expect("capability cache poisoned")
            .remove(id)
            .is_some();
        if removed {
            debug!(layer = %id, "Capability descriptor evicted");
        }
        removed
    }

    /// Subscribe to change notifications; the value is a monotonically
    /// increasing epoch bumped on every insert.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.epoch.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("capability cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::new()
    }
}
