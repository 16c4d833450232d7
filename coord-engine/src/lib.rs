//! Asynchronous coordination of named actions into a process: a single
//! action's init/execute/retry loop (see [`run`]), and a full process
//! engine (see [`Process`]) that uses a pluggable [`ProcessLogic`] to
//! decide which actions run next, with rollback-on-failure and
//! fire-and-forget terminal hooks.

#![forbid(unsafe_code)]

mod action;
mod context;
mod error;
mod logic;
mod process;
mod run;

pub use action::{action, Action, ActionBuilder, ActionFrame};
pub use context::{Context, ControlHandle};
pub use error::{ActionError, BoxError, CancelledError, ProcessError, SharedError};
pub use logic::{
    DependenciesLogic, LogicFrame, Predicate, ProcessLogic, Transition, TransitionsLogic,
    INITIAL_STATE_KEY,
};
pub use process::{create, Execution, Process};
pub use run::run;
