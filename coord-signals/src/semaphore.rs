use tokio::sync::Mutex;
use tracing::debug;

use crate::waiter::WaiterQueue;

struct Inner {
    limit: i64,
    running: i64,
    waiters: WaiterQueue,
}

/// A bounded-pool gate permitting at most `limit` concurrent holders.
pub struct Semaphore {
    inner: Mutex<Inner>,
}

impl Semaphore {
    /// `limit < 1` is clamped to 1 rather than rejected — see DESIGN.md.
    pub fn new(limit: i64) -> Self {
        let limit = if limit < 1 { 1 } else { limit };
        Self {
            inner: Mutex::new(Inner {
                limit,
                running: 0,
                waiters: WaiterQueue::new(),
            }),
        }
    }

    /// Acquires a slot, queueing FIFO if the pool is full.
    pub async fn wait(&self) {
        let rx = {
            let mut inner = self.inner.lock().await;
            if inner.running < inner.limit {
                inner.running += 1;
                None
            } else {
                Some(inner.waiters.push())
            }
        };
        if let Some(rx) = rx {
            let _ = rx.await;
        }
    }

    /// Frees up to `n` slots. Each of the `n` releases either hands a slot
    /// directly to the next queued waiter (FIFO, `running` unchanged — the
    /// waiter becomes the new holder of that slot) or, once the queue is
    /// drained, decrements `running`. Extra releases beyond `running +
    /// queued` are absorbed: `running` cannot go negative, so `available`
    /// never exceeds `limit`.
    pub async fn release(&self, n: i64) {
        let n = if n < 1 { 1 } else { n };
        let mut inner = self.inner.lock().await;
        for _ in 0..n {
            if !inner.waiters.release_one() {
                inner.running = (inner.running - 1).max(0);
            }
        }
        debug!(running = inner.running, queued = inner.waiters.len(), "semaphore released");
    }

    pub async fn available(&self) -> i64 {
        let inner = self.inner.lock().await;
        (inner.limit - inner.running).max(0)
    }

    pub async fn queued(&self) -> usize {
        self.inner.lock().await.waiters.len()
    }

    pub async fn running(&self) -> i64 {
        self.inner.lock().await.running
    }

    pub async fn limit(&self) -> i64 {
        self.inner.lock().await.limit
    }
}

/// Creates a semaphore. `limit` defaults to 5 at the call site's
/// discretion; pass it explicitly here.
pub fn semaphore(limit: i64) -> Semaphore {
    Semaphore::new(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// S4 — four waiters on a limit-2 semaphore, each releasing on
    /// completion; all four eventually resolve.
    #[tokio::test]
    async fn s4_semaphore_drains_all_waiters() {
        let s = Arc::new(semaphore(2));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let s = s.clone();
            handles.push(tokio::spawn(async move {
                s.wait().await;
                s.release(1).await;
            }));
        }

        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(s.running().await, 0);
        assert_eq!(s.queued().await, 0);
        assert_eq!(s.available().await, 2);
    }

    #[tokio::test]
    async fn invariants_hold_under_saturation() {
        let s = semaphore(2);
        s.wait().await;
        s.wait().await;
        assert_eq!(s.running().await, 2);
        assert_eq!(s.available().await, 0);

        let s = Arc::new(s);
        let s2 = s.clone();
        let waiter = tokio::spawn(async move {
            s2.wait().await;
        });
        tokio::task::yield_now().await;
        assert_eq!(s.queued().await, 1);
        assert_eq!(s.running().await, 2); // queued > 0 => running == limit

        s.release(1).await;
        waiter.await.unwrap();
        assert_eq!(s.running().await, 2);
        assert_eq!(s.queued().await, 0);
    }

    #[tokio::test]
    async fn excess_release_never_exceeds_limit() {
        let s = semaphore(3);
        s.release(10).await;
        assert_eq!(s.running().await, 0);
        assert_eq!(s.available().await, 3);
    }

    #[tokio::test]
    async fn zero_or_negative_limit_clamps_to_one() {
        let s = semaphore(0);
        assert_eq!(s.limit().await, 1);
        let s = semaphore(-5);
        assert_eq!(s.limit().await, 1);
    }
}
