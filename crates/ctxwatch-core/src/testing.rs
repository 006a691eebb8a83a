//! Fakes shared by the unit tests.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::informer::{Connector, InformerEvent, InformerHandle, InformerSink, WatchRequest};
use crate::publisher::{Channel, Publisher};
use crate::resource::ResourceName;

#[derive(Clone, Default)]
pub(crate) struct RecordingPublisher {
    published: Arc<Mutex<Vec<(Channel, Value)>>>,
}

impl Publisher for RecordingPublisher {
    fn publish(&self, channel: Channel, payload: Value) {
        self.published.lock().unwrap().push((channel, payload));
    }
}

impl RecordingPublisher {
    pub fn all(&self) -> Vec<(Channel, Value)> {
        self.published.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn count_for(&self, channel: Channel) -> usize {
        self.published.lock().unwrap().iter().filter(|(c, _)| *c == channel).count()
    }

    pub fn last(&self, channel: Channel) -> Option<Value> {
        self.published.lock().unwrap().iter().rev().find(|(c, _)| *c == channel).map(|(_, v)| v.clone())
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

pub(crate) struct OpenedStream {
    pub request: WatchRequest,
    pub sink: InformerSink,
    pub cancel: CancellationToken,
}

#[derive(Clone, Default)]
pub(crate) struct FakeConnector {
    opened: Arc<Mutex<Vec<OpenedStream>>>,
}

impl Connector for FakeConnector {
    fn open(&self, request: WatchRequest, sink: InformerSink) -> InformerHandle {
        let cancel = CancellationToken::new();
        self.opened.lock().unwrap().push(OpenedStream {
            request,
            sink,
            cancel: cancel.clone(),
        });
        InformerHandle::new(cancel)
    }
}

impl FakeConnector {
    /// Number of streams ever opened for (context, resource).
    pub fn opened(&self, context: &str, resource: ResourceName) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.request.context.name == context && s.request.resource == resource)
            .count()
    }

    /// Number of streams for (context, resource) that were not stopped.
    pub fn active(&self, context: &str, resource: ResourceName) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.request.context.name == context && s.request.resource == resource && !s.cancel.is_cancelled())
            .count()
    }

    pub fn total_active(&self) -> usize {
        self.opened.lock().unwrap().iter().filter(|s| !s.cancel.is_cancelled()).count()
    }

    /// Sink of the most recently opened stream for (context, resource).
    pub fn sink(&self, context: &str, resource: ResourceName) -> InformerSink {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.request.context.name == context && s.request.resource == resource)
            .map(|s| s.sink.clone())
            .unwrap_or_else(|| panic!("no stream opened for {context}/{resource}"))
    }

    pub fn request(&self, context: &str, resource: ResourceName) -> WatchRequest {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.request.context.name == context && s.request.resource == resource)
            .map(|s| s.request.clone())
            .unwrap_or_else(|| panic!("no stream opened for {context}/{resource}"))
    }

    pub fn send(&self, context: &str, resource: ResourceName, event: InformerEvent) {
        self.sink(context, resource).send(event);
    }
}

pub(crate) fn object(uid: &str, name: &str) -> Value {
    json!({ "metadata": { "uid": uid, "name": name } })
}
