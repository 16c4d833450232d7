use std::sync::Arc;

use crate::action::Action;
use crate::context::Context;
use crate::error::ActionError;

/// Executes a single action's exec-phase: `init` (once, if `initialize`),
/// then `execute`, retrying via `retry` until one succeeds or `retry`
/// itself rejects (spec §4.3, §6 item 5).
///
/// Does **not** invoke `rollback`/`failure`/`success` — those are the
/// process engine's responsibility once it knows whether the whole
/// process is aborting or resolving. Exposed directly for tests and for
/// composing an action's exec-phase outside of a full [`crate::process::Process`].
pub async fn run(
    action: &Action,
    context: Arc<Context>,
    initialize: bool,
) -> Result<(), ActionError> {
    if initialize {
        action
            .call_init(&context)
            .await
            .map_err(|source| ActionError {
                action: action.name().to_string(),
                source,
            })?;
    }

    loop {
        match action.call_execute(&context).await {
            Ok(value) => {
                context.mark_completed(action.name(), value).await;
                return Ok(());
            }
            Err(err) => match action.call_retry(&context, err).await {
                Ok(()) => continue,
                Err(source) => {
                    return Err(ActionError {
                        action: action.name().to_string(),
                        source,
                    });
                }
            },
        }
    }
}
