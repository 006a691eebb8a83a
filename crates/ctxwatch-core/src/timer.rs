use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct PendingTimer {
    generation: u64,
    task: JoinHandle<()>,
}

/// One-shot timers keyed by `K` that post a message to the manager queue.
///
/// Each scheduled timer gets a fresh generation. `fire` only accepts the
/// message of the timer currently registered for the key, so a timer that
/// was cancelled or replaced can never take effect, even if its message was
/// already queued.
pub(crate) struct TimerSet<K> {
    next_generation: u64,
    pending: HashMap<K, PendingTimer>,
}

impl<K: Eq + Hash + Clone> TimerSet<K> {
    pub fn new() -> Self {
        Self { next_generation: 0, pending: HashMap::new() }
    }

    pub fn schedule<M: Send + 'static>(
        &mut self,
        key: K,
        delay: Duration,
        tx: &mpsc::UnboundedSender<M>,
        message: impl FnOnce(u64) -> M,
    ) -> u64 {
        self.cancel(&key);
        self.next_generation += 1;
        let generation = self.next_generation;
        let message = message(generation);
        let deadline = Instant::now() + delay;
        let tx = tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(message);
        });
        self.pending.insert(key, PendingTimer { generation, task });
        generation
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&K) -> bool) {
        let keys: Vec<K> = self.pending.keys().filter(|k| predicate(k)).cloned().collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.pending.drain() {
            timer.task.abort();
        }
    }

    /// Consumes the timer if `generation` is the live one for `key`.
    pub fn fire(&mut self, key: &K, generation: u64) -> bool {
        match self.pending.get(key) {
            Some(timer) if timer.generation == generation => {
                self.pending.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

impl<K> Drop for TimerSet<K> {
    fn drop(&mut self) {
        for timer in self.pending.values() {
            timer.task.abort();
        }
    }
}
