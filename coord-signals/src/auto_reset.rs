use tokio::sync::Mutex;
use tracing::debug;

use crate::waiter::WaiterQueue;

struct Inner {
    signaled: bool,
    waiters: WaiterQueue,
}

/// A gate that releases exactly one waiter per `set()`, then closes again.
pub struct AutoResetEvent {
    inner: Mutex<Inner>,
}

impl AutoResetEvent {
    pub fn new(signaled: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                signaled,
                waiters: WaiterQueue::new(),
            }),
        }
    }

    pub async fn wait(&self) {
        let rx = {
            let mut inner = self.inner.lock().await;
            if inner.signaled {
                inner.signaled = false;
                return;
            }
            inner.waiters.push()
        };
        let _ = rx.await;
    }

    /// If any waiter is queued, releases exactly one (FIFO) and leaves the
    /// gate closed. Otherwise opens the gate so the next `wait()` passes.
    pub async fn set(&self) {
        let mut inner = self.inner.lock().await;
        if inner.waiters.release_one() {
            inner.signaled = false;
            debug!("auto-reset signal released one queued waiter");
        } else {
            inner.signaled = true;
            debug!("auto-reset signal armed (no waiter queued)");
        }
    }

    pub async fn reset(&self) {
        self.inner.lock().await.signaled = false;
    }

    pub async fn is_signaled(&self) -> bool {
        self.inner.lock().await.signaled
    }
}

impl Default for AutoResetEvent {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Creates an auto-reset signal. See [`AutoResetEvent`].
pub fn auto_reset(signaled: bool) -> AutoResetEvent {
    AutoResetEvent::new(signaled)
}
