//! The event queue and its paired signal: a FIFO of [`ReceivedEvent`]s plus
//! a condition variable, locked together. Producers (the Reader) append a
//! whole batch and notify one waiter; shutdown broadcasts to every waiter.

use crate::flag::ShutdownFlag;
use crate::received_event::ReceivedEvent;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct EventQueue {
    queue: Mutex<VecDeque<ReceivedEvent>>,
    signal: Condvar,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            signal: Condvar::new(),
        }
    }

    /// Append a whole batch (in order) and wake exactly one waiting router.
    pub fn push_batch(&self, batch: impl IntoIterator<Item = ReceivedEvent>) {
        let mut queue = self.queue.lock().expect("event queue lock poisoned");
        let before = queue.len();
        queue.extend(batch);
        if queue.len() == before {
            return; // empty batch, nothing to wake for
        }
        drop(queue);
        self.signal.notify_one();
    }

    /// Wake every router blocked on an empty queue. Called once by the
    /// supervisor at the start of shutdown, right after the shutdown flag
    /// is set.
    pub fn notify_shutdown(&self) {
        let _queue = self.queue.lock().expect("event queue lock poisoned");
        self.signal.notify_all();
    }

    /// Block until the queue is non-empty or `shutdown` becomes set, then
    /// drain the entire queue into a router-local buffer, preserving order.
    ///
    /// Returns `None` only when shutdown was observed with nothing left to
    /// route; the router worker should exit in that case. A bounded wait
    /// (`poll_timeout`) guarantees shutdown is re-checked at least that
    /// often even if a notification is missed.
    pub fn drain_blocking(
        &self,
        shutdown: &ShutdownFlag,
        poll_timeout: Duration,
    ) -> Option<VecDeque<ReceivedEvent>> {
        let mut queue = self.queue.lock().expect("event queue lock poisoned");
        loop {
            if !queue.is_empty() {
                return Some(std::mem::take(&mut *queue));
            }
            if shutdown.is_set() {
                return None;
            }
            let (guard, _timeout_result) = self
                .signal
                .wait_timeout(queue, poll_timeout)
                .expect("event queue lock poisoned");
            queue = guard;
        }
    }
}
