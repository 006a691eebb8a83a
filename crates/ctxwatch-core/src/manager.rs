use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::backoff::BackoffScheduler;
use crate::debounce::DispatchDebouncer;
use crate::error::{FailureKind, ManagerError};
use crate::event::{ManagerEvent, RetryKey};
use crate::informer::{Connector, InformerEvent, InformerSink, WatchRequest};
use crate::informers::InformersRegistry;
use crate::kubeconfig::{KubeConfig, KubeContext};
use crate::publisher::Publisher;
use crate::resource::ResourceName;
use crate::states::{CheckingPhase, StatesRegistry};
use crate::timer::TimerSet;

mod handle;

pub use handle::{ManagerCommand, ManagerHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManagerOptions {
    pub connect_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub backoff: BackoffScheduler,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            dispatch_timeout: Duration::from_millis(100),
            backoff: BackoffScheduler::default(),
        }
    }
}

/// Keeps one set of streams per configured context and republishes their
/// consolidated state.
///
/// All work happens on one event queue: stream events, backoff timers and
/// debounce timers are messages handled by [`ContextsManager::handle_event`].
/// Every stream and timer carries a generation; once it is stopped or
/// replaced, its late messages are dropped.
pub struct ContextsManager<C, P> {
    connector: C,
    options: ManagerOptions,
    contexts: IndexMap<String, KubeContext>,
    current: Option<String>,
    states: StatesRegistry<P>,
    informers: InformersRegistry,
    retries: TimerSet<RetryKey>,
    attempts: HashMap<RetryKey, u32>,
    watchers: BTreeSet<ResourceName>,
    next_generation: u64,
    tx: mpsc::UnboundedSender<ManagerEvent>,
    events: Option<mpsc::UnboundedReceiver<ManagerEvent>>,
    disposed: bool,
}

impl<C: Connector, P: Publisher> ContextsManager<C, P> {
    pub fn new(connector: C, publisher: P, options: ManagerOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = DispatchDebouncer::new(options.dispatch_timeout, tx.clone());
        Self {
            connector,
            options,
            contexts: IndexMap::new(),
            current: None,
            states: StatesRegistry::new(publisher, debouncer),
            informers: InformersRegistry::new(),
            retries: TimerSet::new(),
            attempts: HashMap::new(),
            watchers: BTreeSet::new(),
            next_generation: 0,
            tx,
            events: Some(rx),
            disposed: false,
        }
    }

    /// Reconciles against a new configuration snapshot. Never fails:
    /// contexts that cannot be resolved are treated as absent.
    pub fn update(&mut self, config: &KubeConfig) {
        if self.disposed {
            warn!("Ignoring configuration update on a disposed contexts manager");
            return;
        }
        let next = config.resolve_contexts();

        let removed: Vec<String> = self
            .contexts
            .iter()
            .filter(|(name, old)| next.get(*name).map_or(true, |new| !new.same_identity(old)))
            .map(|(name, _)| name.clone())
            .collect();
        let added: Vec<String> = next
            .iter()
            .filter(|(name, new)| self.contexts.get(*name).map_or(true, |old| !old.same_identity(new)))
            .map(|(name, _)| name.clone())
            .collect();

        for name in &removed {
            self.remove_context(name);
        }

        self.contexts = next;
        let previous = self.current.take();
        let current = config.current_context.clone().filter(|name| self.contexts.contains_key(name));
        self.current = current.clone();
        self.states.set_current(current.clone());

        for name in &added {
            self.add_context(name);
        }

        if current != previous {
            info!(from = ?previous, to = ?current, "Current context changed");
            if let Some(previous) = previous.as_deref().filter(|name| self.contexts.contains_key(*name)) {
                self.stop_secondary_informers(previous);
                self.reschedule_reconnect(previous);
            }
            if let Some(current) = current.as_deref() {
                self.reschedule_reconnect(current);
                if self.states.is_reachable(current) {
                    self.start_secondary_informers(current);
                }
            }
        }

        debug!(added = added.len(), removed = removed.len(), contexts = self.contexts.len(), "Contexts reconciled");
        self.states.dispatch_all();
    }

    /// Asks for continuous data of `resource` on the current context.
    pub fn register_get_current_context_resources(&mut self, resource: ResourceName) {
        if self.disposed || !self.watchers.insert(resource) {
            return;
        }
        debug!(%resource, "Registered current context watcher");
        if resource.is_primary() {
            self.states.dispatch_current_context_resource(resource);
            return;
        }
        let Some(current) = self.current.clone() else { return };
        if self.states.is_reachable(&current) {
            if let Err(e) = self.start_resource_informer(&current, resource) {
                warn!("Failed to start {resource} informer: {e}");
            }
        }
    }

    pub fn unregister_get_current_context_resources(&mut self, resource: ResourceName) {
        if !self.watchers.remove(&resource) {
            return;
        }
        debug!(%resource, "Unregistered current context watcher");
        if resource.is_primary() {
            return;
        }
        if let Some(current) = self.current.clone() {
            self.stop_secondary_informer(&current, resource);
        }
    }

    /// Opens the stream for (context, resource) unless one is already live.
    /// Secondary kinds only open on the current context, once registered.
    pub fn start_resource_informer(&mut self, context_name: &str, resource: ResourceName) -> Result<(), ManagerError> {
        let context = self.contexts.get(context_name).ok_or_else(|| ManagerError::ContextNotFound(context_name.into()))?;
        if !resource.is_primary() && !(self.states.is_current(context_name) && self.watchers.contains(&resource)) {
            debug!(context = context_name, %resource, "Not starting unregistered or non-current informer");
            return Ok(());
        }
        let namespace = context.namespace_or_default().to_string();
        let path = resource.path(&namespace);
        if self.informers.has(context_name, &path) {
            trace!(context = context_name, %path, "Informer already running");
            return Ok(());
        }

        let request = WatchRequest {
            context: context.clone(),
            resource,
            namespace,
            path: path.clone(),
            connect_timeout: self.options.connect_timeout,
        };
        self.next_generation += 1;
        let generation = self.next_generation;
        let sink = InformerSink::new(context_name, resource, generation, self.tx.clone());
        let handle = self.connector.open(request, sink);
        self.informers.add(context_name, &path, resource, generation, handle);
        debug!(context = context_name, %path, generation, "Started informer");
        Ok(())
    }

    /// Restarts every stream of a context right away, dropping any pending backoff.
    pub fn refresh_context_state(&mut self, context_name: &str) -> Result<(), ManagerError> {
        if !self.contexts.contains_key(context_name) {
            return Err(ManagerError::ContextNotFound(context_name.into()));
        }
        info!(context = context_name, "Refreshing context state");
        self.informers.delete_context_informers(context_name);
        self.retries.cancel_where(|key| key.context() == context_name);
        self.attempts.retain(|key, _| key.context() != context_name);
        self.states.set_checking(context_name, CheckingPhase::Checking);
        self.start_primary_informers(context_name);
        if self.states.is_current(context_name) && self.states.is_reachable(context_name) {
            self.start_secondary_informers(context_name);
        }
        Ok(())
    }

    /// Whether `context` matches, by cluster, user and namespace, a context of
    /// the loaded configuration.
    pub fn is_context_in_kubeconfig(&self, context: &KubeContext) -> bool {
        self.contexts.get(&context.name).is_some_and(|known| {
            known.cluster_info == context.cluster_info
                && known.user == context.user
                && known.namespace == context.namespace
        })
    }

    /// Stops every stream, cancels every timer and forgets all state. Nothing
    /// is published afterwards, including by timers that were already due.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.informers.dispose();
        self.retries.cancel_all();
        self.attempts.clear();
        self.states.dispose();
        self.contexts.clear();
        self.watchers.clear();
        self.current = None;
        info!("Contexts manager disposed");
    }

    pub fn handle_event(&mut self, event: ManagerEvent) {
        if self.disposed {
            return;
        }
        match event {
            ManagerEvent::Informer { context, resource, generation, event } => {
                if !self.informers.is_live(&context, resource, generation) {
                    trace!(%context, %resource, generation, "Dropping event of a stopped informer");
                    return;
                }
                self.on_informer_event(&context, resource, event);
            }
            ManagerEvent::Retry { key, generation } => {
                if self.retries.fire(&key, generation) {
                    self.on_retry(key);
                } else {
                    trace!(?key, generation, "Dropping cancelled retry");
                }
            }
            ManagerEvent::Dispatch { channel, generation } => self.states.flush(channel, generation),
        }
    }

    /// Handles every queued event without waiting. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.events.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits for the next queued event.
    pub async fn next_event(&mut self) -> Option<ManagerEvent> {
        match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    pub fn states(&self) -> &StatesRegistry<P> {
        &self.states
    }

    pub fn informers(&self) -> &InformersRegistry {
        &self.informers
    }

    pub fn current_context(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn watchers(&self) -> &BTreeSet<ResourceName> {
        &self.watchers
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn add_context(&mut self, name: &str) {
        debug!(context = name, "Adding context");
        self.states.create_context(name);
        self.start_primary_informers(name);
    }

    fn remove_context(&mut self, name: &str) {
        debug!(context = name, "Removing context");
        self.informers.delete_context_informers(name);
        self.retries.cancel_where(|key| key.context() == name);
        self.attempts.retain(|key, _| key.context() != name);
        self.states.remove_context(name);
    }

    fn start_primary_informers(&mut self, name: &str) {
        for resource in ResourceName::PRIMARY {
            if let Err(e) = self.start_resource_informer(name, resource) {
                warn!("Failed to start {resource} informer: {e}");
            }
        }
    }

    fn start_secondary_informers(&mut self, name: &str) {
        let secondary: Vec<ResourceName> = self.watchers.iter().copied().filter(|r| !r.is_primary()).collect();
        for resource in secondary {
            if let Err(e) = self.start_resource_informer(name, resource) {
                warn!("Failed to start {resource} informer: {e}");
            }
        }
    }

    fn stop_secondary_informer(&mut self, name: &str, resource: ResourceName) {
        if let Some(context) = self.contexts.get(name) {
            let path = resource.path(context.namespace_or_default());
            self.informers.stop(name, &path);
        }
        let key = RetryKey::Secondary(name.to_string(), resource);
        self.retries.cancel(&key);
        self.attempts.remove(&key);
        self.states.clear_resource(name, resource);
    }

    fn stop_secondary_informers(&mut self, name: &str) {
        for resource in ResourceName::ALL.into_iter().filter(|r| !r.is_primary()) {
            self.stop_secondary_informer(name, resource);
        }
    }

    fn on_informer_event(&mut self, context: &str, resource: ResourceName, event: InformerEvent) {
        let descriptor = resource.descriptor();
        match event {
            InformerEvent::Connected => self.on_connected(context, resource),
            InformerEvent::Added(object) => {
                if descriptor.accepts(&object) {
                    self.states.mutate_resource(context, resource, |list| list.add(object));
                }
            }
            InformerEvent::Updated(object) => {
                if descriptor.accepts(&object) {
                    self.states.mutate_resource(context, resource, |list| list.update(object));
                }
            }
            InformerEvent::Deleted(object) => {
                self.states.mutate_resource(context, resource, |list| list.delete(&object));
            }
            InformerEvent::Failed(message) => self.on_failed(context, resource, &message),
        }
    }

    fn on_connected(&mut self, context: &str, resource: ResourceName) {
        // A connection always starts with a complete listing.
        self.states.clear_resource(context, resource);

        if !resource.is_primary() {
            self.attempts.remove(&RetryKey::Secondary(context.to_string(), resource));
            debug!(context, %resource, "Secondary informer connected");
            return;
        }

        let was_reachable = self.states.is_reachable(context);
        self.attempts.remove(&RetryKey::Reconnect(context.to_string()));
        self.states.set_state_and_dispatch(context, |state| {
            state.reachable = true;
            state.error = None;
        });
        self.states.set_checking(context, CheckingPhase::Waiting);
        if !was_reachable {
            info!(context, "Context is reachable");
            if self.states.is_current(context) {
                self.start_secondary_informers(context);
            }
        }
    }

    fn on_failed(&mut self, context: &str, resource: ResourceName, message: &str) {
        let failure = FailureKind::classify(message);

        if !resource.is_primary() {
            if let Some(ctx) = self.contexts.get(context) {
                let path = resource.path(ctx.namespace_or_default());
                self.informers.stop(context, &path);
            }
            self.states.clear_resource(context, resource);
            let delay = self.schedule_retry(RetryKey::Secondary(context.to_string(), resource));
            warn!(context, %resource, %failure, delay_ms = delay.as_millis() as u64, "Informer failed: {message}");
            return;
        }

        self.informers.delete_context_informers(context);
        self.retries.cancel_where(|key| matches!(key, RetryKey::Secondary(c, _) if c == context));
        self.attempts.retain(|key, _| !matches!(key, RetryKey::Secondary(c, _) if c == context));
        for resource in ResourceName::ALL {
            self.states.clear_resource(context, resource);
        }
        let error = message.to_string();
        self.states.set_state_and_dispatch(context, |state| {
            state.reachable = false;
            state.error = Some(error);
        });
        self.states.set_checking(context, CheckingPhase::Waiting);

        let delay = self.schedule_retry(RetryKey::Reconnect(context.to_string()));
        warn!(context, %resource, %failure, delay_ms = delay.as_millis() as u64, "Context unreachable: {message}");
    }

    fn schedule_retry(&mut self, key: RetryKey) -> Duration {
        let is_current = self.states.is_current(key.context());
        let attempt = self.attempts.get(&key).copied().unwrap_or(0);
        let delay = self.options.backoff.next_delay(attempt, is_current);
        self.attempts.insert(key.clone(), attempt.saturating_add(1));
        self.retries.schedule(key.clone(), delay, &self.tx, |generation| ManagerEvent::Retry { key, generation });
        delay
    }

    /// A pending reconnect restarts its wait under the policy matching the
    /// context's role after a current-context switch, keeping its attempt number.
    fn reschedule_reconnect(&mut self, name: &str) {
        let key = RetryKey::Reconnect(name.to_string());
        if !self.retries.is_pending(&key) {
            return;
        }
        let attempt = self.attempts.get(&key).copied().unwrap_or(1).saturating_sub(1);
        let delay = self.options.backoff.next_delay(attempt, self.states.is_current(name));
        debug!(context = name, delay_ms = delay.as_millis() as u64, "Rescheduled reconnect");
        self.retries.schedule(key.clone(), delay, &self.tx, |generation| ManagerEvent::Retry { key, generation });
    }

    fn on_retry(&mut self, key: RetryKey) {
        match key {
            RetryKey::Reconnect(context) => {
                if !self.contexts.contains_key(&context) {
                    return;
                }
                debug!(%context, "Reconnecting");
                self.states.set_checking(&context, CheckingPhase::Checking);
                self.start_primary_informers(&context);
            }
            RetryKey::Secondary(context, resource) => {
                let wanted = self.states.is_current(&context)
                    && self.watchers.contains(&resource)
                    && self.states.is_reachable(&context);
                if !wanted {
                    return;
                }
                if let Err(e) = self.start_resource_informer(&context, resource) {
                    warn!("Failed to restart {resource} informer: {e}");
                }
            }
        }
    }
}
