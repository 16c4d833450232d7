use tokio::sync::Mutex;
use tracing::debug;

use crate::waiter::WaiterQueue;

struct Inner {
    signaled: bool,
    waiters: WaiterQueue,
}

/// A gate that, once opened, releases every queued waiter and every future
/// `wait()` resolves immediately until `reset()` closes it again.
pub struct ManualResetEvent {
    inner: Mutex<Inner>,
}

impl ManualResetEvent {
    pub fn new(signaled: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                signaled,
                waiters: WaiterQueue::new(),
            }),
        }
    }

    /// Resolves immediately if the signal is open; otherwise queues and
    /// resolves the next time `set()` is called.
    pub async fn wait(&self) {
        let rx = {
            let mut inner = self.inner.lock().await;
            if inner.signaled {
                return;
            }
            inner.waiters.push()
        };
        let _ = rx.await;
    }

    /// Opens the gate and releases every queued waiter in FIFO order.
    pub async fn set(&self) {
        let mut inner = self.inner.lock().await;
        inner.signaled = true;
        let released = inner.waiters.release_all();
        debug!(released, "manual-reset signal opened");
    }

    /// Closes the gate. Does not retroactively re-queue already-released
    /// waiters.
    pub async fn reset(&self) {
        self.inner.lock().await.signaled = false;
    }

    pub async fn is_signaled(&self) -> bool {
        self.inner.lock().await.signaled
    }
}

impl Default for ManualResetEvent {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Creates a manual-reset signal. See [`ManualResetEvent`].
pub fn manual_reset(signaled: bool) -> ManualResetEvent {
    ManualResetEvent::new(signaled)
}
