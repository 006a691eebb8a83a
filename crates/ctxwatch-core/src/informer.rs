use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::ManagerEvent;
use crate::kubeconfig::KubeContext;
use crate::resource::ResourceName;

#[derive(Debug, Clone, PartialEq)]
pub enum InformerEvent {
    Connected,
    Added(Value),
    Updated(Value),
    Deleted(Value),
    Failed(String),
}

/// Everything a connector needs to open one stream.
#[derive(Debug, Clone)]
pub struct WatchRequest {
    pub context: KubeContext,
    pub resource: ResourceName,
    pub namespace: String,
    pub path: String,
    pub connect_timeout: Duration,
}

/// Posts the events of one stream onto the manager queue.
#[derive(Debug, Clone)]
pub struct InformerSink {
    context: String,
    resource: ResourceName,
    generation: u64,
    tx: mpsc::UnboundedSender<ManagerEvent>,
}

impl InformerSink {
    pub(crate) fn new(
        context: &str,
        resource: ResourceName,
        generation: u64,
        tx: mpsc::UnboundedSender<ManagerEvent>,
    ) -> Self {
        Self { context: context.to_string(), resource, generation, tx }
    }

    /// Returns false once the manager is gone; the stream should stop.
    pub fn send(&self, event: InformerEvent) -> bool {
        self.tx
            .send(ManagerEvent::Informer {
                context: self.context.clone(),
                resource: self.resource,
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Live stream handle. Stopping or dropping it cancels the stream.
#[derive(Debug)]
pub struct InformerHandle {
    cancel: CancellationToken,
}

impl InformerHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for InformerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Opens a watch on one resource collection of one context.
///
/// Implementations deliver `Connected` once the initial listing succeeded,
/// then add/update/delete events in the order the server sent them, and
/// finish with at most one `Failed`.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, request: WatchRequest, sink: InformerSink) -> InformerHandle;
}
