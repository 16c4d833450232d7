//! Property tests for the "for all sequences of waits/releases..." style
//! invariants spec.md §8 states universally, rather than as a fixed
//! example grid (that's what the `#[cfg(test)]` modules inside each
//! signal type already cover).

use std::sync::{Arc, Mutex as StdMutex};

use coord_signals::{auto_reset, countdown, semaphore};
use proptest::prelude::*;

fn current_thread_rt() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

proptest! {
    /// Countdown's counter never goes negative, under any interleaving of
    /// increments and decrements of any (clamped) size.
    #[test]
    fn countdown_counter_never_goes_negative(
        ops in proptest::collection::vec((any::<bool>(), 0i64..5), 0..50),
    ) {
        let stayed_non_negative = current_thread_rt().block_on(async {
            let c = countdown(0);
            let mut ok = true;
            for (is_increment, n) in ops {
                if is_increment {
                    c.increment(n).await;
                } else {
                    c.decrement(n).await;
                }
                ok &= c.count().await >= 0;
            }
            ok
        });
        prop_assert!(stayed_non_negative);
    }
}

#[derive(Debug, Clone)]
enum SemOp {
    Acquire,
    Release(i64),
}

fn sem_op_strategy() -> impl Strategy<Value = SemOp> {
    prop_oneof![Just(SemOp::Acquire), (1i64..3).prop_map(SemOp::Release)]
}

proptest! {
    /// A semaphore's `running` count never exceeds its `limit` or dips
    /// below zero, under any sequence of acquires and releases. An acquire
    /// is only attempted when a slot is already free — with nothing else
    /// running to release a held slot, an unconditional `wait()` here
    /// would just deadlock the test instead of exercising anything.
    #[test]
    fn semaphore_running_stays_within_bounds(
        limit in 1i64..4,
        ops in proptest::collection::vec(sem_op_strategy(), 0..30),
    ) {
        let stayed_in_bounds = current_thread_rt().block_on(async {
            let s = semaphore(limit);
            let mut ok = true;
            for op in ops {
                match op {
                    SemOp::Acquire => {
                        if s.available().await > 0 {
                            s.wait().await;
                        }
                    }
                    SemOp::Release(n) => s.release(n).await,
                }
                let running = s.running().await;
                let available = s.available().await;
                ok &= (0..=limit).contains(&running) && (0..=limit).contains(&available);
            }
            ok
        });
        prop_assert!(stayed_in_bounds);
    }
}

proptest! {
    /// Queued waiters on an auto-reset signal are released in the exact
    /// order they called `wait()`, one per `set()`, regardless of how many
    /// are queued.
    #[test]
    fn auto_reset_releases_waiters_in_fifo_order(n in 1usize..8) {
        let released = current_thread_rt().block_on(async {
            let signal = Arc::new(auto_reset(false));
            let log = Arc::new(StdMutex::new(Vec::new()));

            let mut handles = Vec::new();
            for i in 0..n {
                let signal = signal.clone();
                let log = log.clone();
                handles.push(tokio::spawn(async move {
                    signal.wait().await;
                    log.lock().unwrap().push(i);
                }));
            }
            for _ in 0..n {
                tokio::task::yield_now().await;
            }

            for _ in 0..n {
                signal.set().await;
                tokio::task::yield_now().await;
            }

            for handle in handles {
                handle.await.unwrap();
            }
            log.lock().unwrap().clone()
        });
        prop_assert_eq!(released, (0..n).collect::<Vec<_>>());
    }
}
