use std::io::{self, Write};
use std::sync::Mutex;

use ctxwatch_core::{Channel, Publisher};
use jiff::Timestamp;
use serde_json::{json, Value};
use tracing::warn;

/// Writes every published snapshot as one JSON object per line.
pub struct JsonLinesPublisher<W> {
    out: Mutex<W>,
}

impl JsonLinesPublisher<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn line(channel: Channel, at: Timestamp, payload: Value) -> Value {
    json!({
        "channel": channel.name(),
        "at": at.to_string(),
        "payload": payload,
    })
}

impl<W: Write + Send + 'static> Publisher for JsonLinesPublisher<W> {
    fn publish(&self, channel: Channel, payload: Value) {
        let line = line(channel, Timestamp::now(), payload);
        let Ok(mut out) = self.out.lock() else { return };
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!("Failed to write {channel}: {e}");
        }
    }
}
