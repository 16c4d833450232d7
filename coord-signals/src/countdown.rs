use tokio::sync::Mutex;
use tracing::debug;

use crate::waiter::WaiterQueue;

/// Clamp an increment/decrement amount to a minimum of 1, per spec: "treat
/// non-positive or non-integer n as 1".
fn normalize(n: i64) -> i64 {
    if n < 1 {
        1
    } else {
        n
    }
}

struct Inner {
    counter: i64,
    waiters: WaiterQueue,
}

/// A gate that opens once an internal counter reaches zero.
pub struct CountdownEvent {
    inner: Mutex<Inner>,
}

impl CountdownEvent {
    pub fn new(initial: i64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                counter: initial.max(0),
                waiters: WaiterQueue::new(),
            }),
        }
    }

    pub async fn wait(&self) {
        let rx = {
            let mut inner = self.inner.lock().await;
            if inner.counter == 0 {
                return;
            }
            inner.waiters.push()
        };
        let _ = rx.await;
    }

    /// Adds `max(1, n)` to the counter. Has no queued waiters to release —
    /// incrementing only ever moves the counter away from zero.
    pub async fn increment(&self, n: i64) {
        let n = normalize(n);
        let mut inner = self.inner.lock().await;
        inner.counter += n;
    }

    /// Subtracts `max(1, n)` from the counter, clamped at zero. Releases
    /// every queued waiter, in order, the instant the counter reaches
    /// zero. A no-op if the counter is already zero.
    pub async fn decrement(&self, n: i64) {
        let n = normalize(n);
        let mut inner = self.inner.lock().await;
        if inner.counter == 0 {
            return;
        }
        inner.counter = (inner.counter - n).max(0);
        if inner.counter == 0 {
            let released = inner.waiters.release_all();
            debug!(released, "countdown reached zero");
        }
    }

    pub async fn count(&self) -> i64 {
        self.inner.lock().await.counter
    }
}

/// Creates a countdown signal, clamping `initial` to zero if negative.
pub fn countdown(initial: i64) -> CountdownEvent {
    CountdownEvent::new(initial)
}
