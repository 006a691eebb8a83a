use std::collections::HashMap;

use tracing::debug;

use crate::informer::InformerHandle;
use crate::resource::ResourceName;

struct InformerEntry {
    resource: ResourceName,
    generation: u64,
    handle: InformerHandle,
}

/// Live streams keyed by (context, resource path). Holds at most one stream
/// per key; every removal stops the stream it drops.
#[derive(Default)]
pub struct InformersRegistry {
    informers: HashMap<String, HashMap<String, InformerEntry>>,
}

impl InformersRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stream. A stream already registered under the same key is
    /// stopped and replaced.
    pub fn add(&mut self, context: &str, path: &str, resource: ResourceName, generation: u64, handle: InformerHandle) {
        let entries = self.informers.entry(context.to_string()).or_default();
        if let Some(previous) = entries.insert(path.to_string(), InformerEntry { resource, generation, handle }) {
            previous.handle.stop();
        }
    }

    pub fn has(&self, context: &str, path: &str) -> bool {
        self.informers.get(context).is_some_and(|entries| entries.contains_key(path))
    }

    /// Whether `generation` is the live stream for (context, resource).
    pub fn is_live(&self, context: &str, resource: ResourceName, generation: u64) -> bool {
        self.informers
            .get(context)
            .is_some_and(|entries| entries.values().any(|e| e.resource == resource && e.generation == generation))
    }

    pub fn stop(&mut self, context: &str, path: &str) -> bool {
        let Some(entries) = self.informers.get_mut(context) else {
            return false;
        };
        let Some(entry) = entries.remove(path) else {
            return false;
        };
        entry.handle.stop();
        debug!(context, path, "Stopped informer");
        if entries.is_empty() {
            self.informers.remove(context);
        }
        true
    }

    pub fn delete_context_informers(&mut self, context: &str) -> usize {
        let Some(entries) = self.informers.remove(context) else {
            return 0;
        };
        for entry in entries.values() {
            entry.handle.stop();
        }
        debug!(context, count = entries.len(), "Stopped all informers of context");
        entries.len()
    }

    pub fn resources(&self, context: &str) -> Vec<ResourceName> {
        let mut resources: Vec<_> =
            self.informers.get(context).map(|entries| entries.values().map(|e| e.resource).collect()).unwrap_or_default();
        resources.sort();
        resources
    }

    pub fn len(&self) -> usize {
        self.informers.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dispose(&mut self) {
        for (_, entries) in self.informers.drain() {
            for entry in entries.values() {
                entry.handle.stop();
            }
        }
    }
}
