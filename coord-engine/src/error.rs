use std::sync::Arc;

use serde_json::Value;

/// The error type an action's `execute`/`retry` hooks return. Any error
/// type is accepted as long as it is `Send + Sync + 'static`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The abort cause as handed to `rollback`/`failure` hooks. Shared (not
/// cloned) across every fire-and-forget hook invocation for one abort.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Raised by [`crate::run::run`] when an action's retry loop gives up.
/// Carries only the action name — the process-level decoration (process
/// name, `completed`, `running`) is added by the engine, which is the
/// only thing that knows that context.
#[derive(Debug, thiserror::Error)]
#[error("action '{action}' failed: {source}")]
pub struct ActionError {
    pub action: String,
    pub source: BoxError,
}

/// The error surfaced on a process [`crate::process::Execution`].
#[derive(Debug, thiserror::Error, Clone)]
pub enum ProcessError {
    /// An action's `execute` rejected and its `retry` also rejected.
    #[error("action '{action}' failed in process '{process}': {source}")]
    ActionFailure {
        action: String,
        process: String,
        /// Snapshot of `context.completed` at the moment of abort.
        completed: Vec<String>,
        /// `started` minus `completed` at the moment of abort.
        running: Vec<String>,
        source: SharedError,
    },
    /// `cancel(data)` was called on the execution handle or from within
    /// an action hook.
    #[error("process '{process}' cancelled")]
    Cancelled { process: String, data: Value },
}

impl ProcessError {
    /// The action that caused the failure, if this is an [`ActionFailure`](Self::ActionFailure).
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::ActionFailure { action, .. } => Some(action),
            Self::Cancelled { .. } => None,
        }
    }

    pub fn process(&self) -> &str {
        match self {
            Self::ActionFailure { process, .. } | Self::Cancelled { process, .. } => process,
        }
    }

    pub fn completed(&self) -> &[String] {
        match self {
            Self::ActionFailure { completed, .. } => completed,
            Self::Cancelled { .. } => &[],
        }
    }

    pub fn running(&self) -> &[String] {
        match self {
            Self::ActionFailure { running, .. } => running,
            Self::Cancelled { .. } => &[],
        }
    }
}

/// The cause handed to `rollback`/`failure` hooks when the process was
/// cancelled rather than failed by an action.
#[derive(Debug)]
pub struct CancelledError {
    pub data: Value,
}

impl std::fmt::Display for CancelledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Process cancelled.")
    }
}

impl std::error::Error for CancelledError {}
