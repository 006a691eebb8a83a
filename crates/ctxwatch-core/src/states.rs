use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::debounce::DispatchDebouncer;
use crate::publisher::{Channel, Publisher};
use crate::resource::ResourceName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckingPhase {
    Checking,
    Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckingState {
    pub state: CheckingPhase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesCount {
    pub pods: usize,
    pub deployments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextGeneralState {
    pub checking: CheckingState,
    pub reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub resources: ResourcesCount,
}

impl ContextGeneralState {
    fn connecting() -> Self {
        Self {
            checking: CheckingState { state: CheckingPhase::Checking },
            reachable: false,
            error: None,
            resources: ResourcesCount::default(),
        }
    }
}

/// Raw resource objects in arrival order, unique by `metadata.uid`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchedResourceList {
    items: Vec<Value>,
}

fn uid(object: &Value) -> Option<&str> {
    object.pointer("/metadata/uid").and_then(Value::as_str)
}

impl WatchedResourceList {
    fn position(&self, uid_value: &str) -> Option<usize> {
        self.items.iter().position(|item| uid(item) == Some(uid_value))
    }

    /// Appends unless an object with the same uid is already present.
    /// Objects without a uid are ignored.
    pub fn add(&mut self, object: Value) -> bool {
        let Some(key) = uid(&object) else { return false };
        if self.position(key).is_some() {
            return false;
        }
        self.items.push(object);
        true
    }

    /// Replaces in place, or appends when the uid is unknown.
    pub fn update(&mut self, object: Value) -> bool {
        let Some(key) = uid(&object) else { return false };
        match self.position(key) {
            Some(index) => self.items[index] = object,
            None => self.items.push(object),
        }
        true
    }

    pub fn delete(&mut self, object: &Value) -> bool {
        let Some(key) = uid(object) else { return false };
        match self.position(key) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.items.is_empty();
        self.items.clear();
        changed
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// In-memory state of every context, and the publication of it.
pub struct StatesRegistry<P> {
    publisher: P,
    debouncer: DispatchDebouncer,
    general: IndexMap<String, ContextGeneralState>,
    checking: IndexMap<String, CheckingState>,
    resources: HashMap<String, HashMap<ResourceName, WatchedResourceList>>,
    current: Option<String>,
    disposed: bool,
}

impl<P: Publisher> StatesRegistry<P> {
    pub fn new(publisher: P, debouncer: DispatchDebouncer) -> Self {
        Self {
            publisher,
            debouncer,
            general: IndexMap::new(),
            checking: IndexMap::new(),
            resources: HashMap::new(),
            current: None,
            disposed: false,
        }
    }

    /// Fresh entry for a context about to be connected. Replaces any previous one.
    pub fn create_context(&mut self, context: &str) {
        let state = ContextGeneralState::connecting();
        self.checking.insert(context.to_string(), state.checking);
        self.general.insert(context.to_string(), state);
        self.resources.insert(context.to_string(), HashMap::new());
    }

    /// Forgets a context. Nothing is published.
    pub fn remove_context(&mut self, context: &str) {
        self.general.shift_remove(context);
        self.checking.shift_remove(context);
        self.resources.remove(context);
    }

    pub fn contains(&self, context: &str) -> bool {
        self.general.contains_key(context)
    }

    pub fn set_current(&mut self, current: Option<String>) {
        self.current = current;
    }

    pub fn is_current(&self, context: &str) -> bool {
        self.current.as_deref() == Some(context)
    }

    pub fn general_state(&self, context: &str) -> Option<&ContextGeneralState> {
        self.general.get(context)
    }

    pub fn general_states(&self) -> &IndexMap<String, ContextGeneralState> {
        &self.general
    }

    pub fn checking_states(&self) -> &IndexMap<String, CheckingState> {
        &self.checking
    }

    pub fn is_reachable(&self, context: &str) -> bool {
        self.general.get(context).is_some_and(|s| s.reachable)
    }

    pub fn resources(&self, context: &str, resource: ResourceName) -> Option<&WatchedResourceList> {
        self.resources.get(context).and_then(|lists| lists.get(&resource))
    }

    /// Applies `mutate` to the general state of `context`, then asks for a
    /// debounced publication of the channels it feeds.
    pub fn set_state_and_dispatch(&mut self, context: &str, mutate: impl FnOnce(&mut ContextGeneralState)) {
        let Some(state) = self.general.get_mut(context) else { return };
        mutate(state);
        self.sync_counts(context);
        self.request_general(context);
    }

    /// Records a checking transition. Published immediately when it changes.
    pub fn set_checking(&mut self, context: &str, phase: CheckingPhase) {
        let Some(state) = self.general.get_mut(context) else { return };
        if state.checking.state == phase {
            return;
        }
        state.checking.state = phase;
        self.checking.insert(context.to_string(), CheckingState { state: phase });
        self.request_general(context);
        self.dispatch_checking_state();
    }

    /// Runs `mutate` on one resource list; when it reports a change, the
    /// resource channel (and for primary kinds, the general state) is
    /// scheduled for publication.
    pub fn mutate_resource(
        &mut self,
        context: &str,
        resource: ResourceName,
        mutate: impl FnOnce(&mut WatchedResourceList) -> bool,
    ) -> bool {
        let Some(lists) = self.resources.get_mut(context) else { return false };
        if !mutate(lists.entry(resource).or_default()) {
            return false;
        }
        if resource.is_primary() {
            self.sync_counts(context);
            self.request_general(context);
        }
        if self.is_current(context) {
            self.debouncer.request(Channel::CurrentContextResource(resource));
        }
        true
    }

    pub fn clear_resource(&mut self, context: &str, resource: ResourceName) -> bool {
        self.mutate_resource(context, resource, WatchedResourceList::clear)
    }

    fn sync_counts(&mut self, context: &str) {
        let lists = self.resources.get(context);
        let Some(state) = self.general.get_mut(context) else { return };
        state.resources = if state.reachable {
            let len = |r: ResourceName| lists.and_then(|l| l.get(&r)).map_or(0, WatchedResourceList::len);
            ResourcesCount { pods: len(ResourceName::Pods), deployments: len(ResourceName::Deployments) }
        } else {
            ResourcesCount::default()
        };
    }

    fn request_general(&mut self, context: &str) {
        self.debouncer.request(Channel::GeneralState);
        if self.is_current(context) {
            self.debouncer.request(Channel::CurrentContextGeneralState);
        }
    }

    pub fn dispatch_checking_state(&mut self) {
        self.publish_now(Channel::CheckingState);
    }

    pub fn dispatch_general_state(&mut self) {
        self.publish_now(Channel::GeneralState);
    }

    pub fn dispatch_current_context_general_state(&mut self) {
        self.publish_now(Channel::CurrentContextGeneralState);
    }

    pub fn dispatch_current_context_resource(&mut self, resource: ResourceName) {
        self.debouncer.request(Channel::CurrentContextResource(resource));
    }

    pub fn dispatch_current_context_resource_now(&mut self, resource: ResourceName) {
        self.publish_now(Channel::CurrentContextResource(resource));
    }

    /// Publishes every channel right away.
    pub fn dispatch_all(&mut self) {
        self.dispatch_general_state();
        self.dispatch_checking_state();
        self.dispatch_current_context_general_state();
        for resource in ResourceName::ALL {
            self.dispatch_current_context_resource_now(resource);
        }
    }

    /// Handles a fired debounce timer.
    pub fn flush(&mut self, channel: Channel, generation: u64) {
        if !self.debouncer.fire(channel, generation) {
            trace!(%channel, generation, "dropping stale dispatch");
            return;
        }
        self.publish(channel);
    }

    fn publish_now(&mut self, channel: Channel) {
        self.debouncer.cancel(channel);
        self.publish(channel);
    }

    fn publish(&mut self, channel: Channel) {
        if self.disposed {
            return;
        }
        let payload = self.payload(channel);
        self.publisher.publish(channel, payload);
    }

    fn payload(&self, channel: Channel) -> Value {
        match channel {
            Channel::GeneralState => serde_json::to_value(&self.general).unwrap_or(Value::Null),
            Channel::CheckingState => serde_json::to_value(&self.checking).unwrap_or(Value::Null),
            Channel::CurrentContextGeneralState => self
                .current
                .as_deref()
                .and_then(|current| self.general.get(current))
                .and_then(|state| serde_json::to_value(state).ok())
                .unwrap_or(Value::Null),
            Channel::CurrentContextResource(resource) => {
                let items = self
                    .current
                    .as_deref()
                    .and_then(|current| self.resources(current, resource))
                    .map(|list| list.items().to_vec())
                    .unwrap_or_default();
                Value::Array(items)
            }
        }
    }

    /// Cancels pending publications and forgets everything. Nothing is
    /// published afterwards.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.debouncer.cancel_all();
        self.general.clear();
        self.checking.clear();
        self.resources.clear();
        self.current = None;
    }

    pub fn debouncer(&self) -> &DispatchDebouncer {
        &self.debouncer
    }
}
