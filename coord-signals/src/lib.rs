//! In-memory FIFO synchronization gates.
//!
//! Four signal kinds, each an independent, self-contained gate with its own
//! release policy: [`manual_reset`], [`auto_reset`], [`countdown`] and
//! [`semaphore`]. Waiters are always released in arrival order. None of
//! these can fail — `wait()` always resolves eventually (or immediately);
//! callers wanting cancellation of a pending wait layer it externally
//! (e.g. `tokio::select!` against the returned future).

#![forbid(unsafe_code)]

mod auto_reset;
mod countdown;
mod manual_reset;
mod semaphore;
mod waiter;

pub use auto_reset::{auto_reset, AutoResetEvent};
pub use countdown::{countdown, CountdownEvent};
pub use manual_reset::{manual_reset, ManualResetEvent};
pub use semaphore::{semaphore, Semaphore};
