use std::collections::VecDeque;

use tokio::sync::oneshot;

/// FIFO queue of one-shot resolvers. Shared by all four signal kinds so the
/// "released in arrival order" invariant (spec §3.1) only has one
/// implementation to get right.
#[derive(Default)]
pub(crate) struct WaiterQueue {
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl WaiterQueue {
    pub(crate) fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Register a new waiter at the back of the queue.
    pub(crate) fn push(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push_back(tx);
        rx
    }

    /// Release the head of the queue. Returns `true` if a waiter was
    /// actually released. Skips (and drops) waiters whose receiver was
    /// already dropped, since those callers gave up independently of this
    /// signal.
    pub(crate) fn release_one(&mut self) -> bool {
        while let Some(tx) = self.waiters.pop_front() {
            if tx.send(()).is_ok() {
                return true;
            }
        }
        false
    }

    /// Release every queued waiter, in arrival order.
    pub(crate) fn release_all(&mut self) -> usize {
        let mut released = 0;
        while let Some(tx) = self.waiters.pop_front() {
            if tx.send(()).is_ok() {
                released += 1;
            }
        }
        released
    }
}
