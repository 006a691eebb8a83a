use std::time::Duration;

use tokio::sync::mpsc;

use crate::event::ManagerEvent;
use crate::publisher::Channel;
use crate::timer::TimerSet;

/// Trailing-edge coalescing of publish requests, one timer per channel.
///
/// The first request for a channel arms a timer of `window`; requests made
/// while it is pending are absorbed, so a channel is emitted at most once per
/// window and never later than one window after the first request.
pub struct DispatchDebouncer {
    window: Duration,
    timers: TimerSet<Channel>,
    tx: mpsc::UnboundedSender<ManagerEvent>,
}

impl DispatchDebouncer {
    pub fn new(window: Duration, tx: mpsc::UnboundedSender<ManagerEvent>) -> Self {
        Self { window, timers: TimerSet::new(), tx }
    }

    /// A request while the timer is pending does not extend it, so the lag
    /// stays within one window under a steady stream of requests.
    pub fn request(&mut self, channel: Channel) {
        if self.timers.is_pending(&channel) {
            return;
        }
        self.timers.schedule(channel, self.window, &self.tx, |generation| ManagerEvent::Dispatch { channel, generation });
    }

    /// Drops any pending emission; used before publishing immediately.
    pub fn cancel(&mut self, channel: Channel) {
        self.timers.cancel(&channel);
    }

    pub fn cancel_all(&mut self) {
        self.timers.cancel_all();
    }

    /// True when the fired timer is still the live one for `channel`.
    pub fn fire(&mut self, channel: Channel, generation: u64) -> bool {
        self.timers.fire(&channel, generation)
    }

    pub fn is_pending(&self, channel: Channel) -> bool {
        self.timers.is_pending(&channel)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}
