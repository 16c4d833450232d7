use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::action::Action;
use crate::context::{Context, ControlEvent};
use crate::error::{BoxError, CancelledError, ProcessError, SharedError};
use crate::logic::{LogicFrame, ProcessLogic};
use crate::run;

/// A named, deduplicated set of actions driven by a [`ProcessLogic`].
/// Cheap to clone — internals are `Arc`-shared.
#[derive(Clone)]
pub struct Process {
    name: Arc<str>,
    actions: Arc<HashMap<String, Arc<Action>>>,
    order: Arc<Vec<String>>,
    logic: Arc<dyn ProcessLogic>,
}

impl Process {
    /// Deduplicates `actions` by name — first occurrence wins (spec §4.2
    /// step 1).
    pub fn new(name: impl Into<String>, actions: Vec<Action>, logic: Arc<dyn ProcessLogic>) -> Self {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        for a in actions {
            let key = a.name().to_string();
            if !map.contains_key(&key) {
                order.push(key.clone());
                map.insert(key, Arc::new(a));
            }
        }
        Self {
            name: Arc::from(name.into()),
            actions: Arc::new(map),
            order: Arc::new(order),
            logic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts a new invocation with the given arguments, returning a
    /// controllable [`Execution`] immediately — the process runs on a
    /// spawned task.
    pub fn start(&self, args: Vec<Value>) -> Execution {
        let (result_tx, result_rx) = oneshot::channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let control = crate::context::ControlHandle::new(control_tx);
        let seeded = self.logic.context_from_args(&args);
        let context = Arc::new(Context::new(args, seeded, control));

        let actions = self.actions.clone();
        let order = self.order.clone();
        let logic = self.logic.clone();
        let process_name = self.name.clone();
        let ctx_for_task = context.clone();

        tokio::spawn(async move {
            let outcome =
                run_process(process_name, actions, order, logic, ctx_for_task, control_rx).await;
            let _ = result_tx.send(outcome);
        });

        Execution { context, result: result_rx }
    }
}

/// `create(name, actions, logic)` per spec §6 item 3.
pub fn create(name: impl Into<String>, actions: Vec<Action>, logic: Arc<dyn ProcessLogic>) -> Process {
    Process::new(name, actions, logic)
}

/// The controllable completion handle returned by [`Process::start`].
pub struct Execution {
    context: Arc<Context>,
    result: oneshot::Receiver<Result<BTreeMap<String, Value>, ProcessError>>,
}

impl Execution {
    pub fn stop(&self) {
        self.context.stop();
    }

    pub fn cancel(&self, data: Option<Value>) {
        self.context.cancel(data);
    }

    pub fn update(&self, conditions: Option<Map<String, Value>>) {
        self.context.update(conditions);
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Awaits the process's resolution or rejection.
    pub async fn wait(self) -> Result<BTreeMap<String, Value>, ProcessError> {
        self.result
            .await
            .expect("process task ended without sending a result")
    }
}

enum ActionEvent {
    Success(String),
    Failure(String, BoxError),
}

async fn run_process(
    process_name: Arc<str>,
    actions: Arc<HashMap<String, Arc<Action>>>,
    order: Arc<Vec<String>>,
    logic: Arc<dyn ProcessLogic>,
    context: Arc<Context>,
    mut control_rx: mpsc::UnboundedReceiver<ControlEvent>,
) -> Result<BTreeMap<String, Value>, ProcessError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ActionEvent>();
    let mut active: HashSet<String> = HashSet::new();

    let logic_frame = |conditions: &Map<String, Value>, started: &[String], completed: &[String]| {
        LogicFrame {
            conditions,
            started,
            completed,
            control: context.control_handle(),
        }
    };

    let spawn = |name: &str, active: &mut HashSet<String>| {
        if !active.insert(name.to_string()) {
            return;
        }
        let action = actions[name].clone();
        let ctx = context.clone();
        let tx = event_tx.clone();
        let process_name = process_name.clone();
        tokio::spawn(async move {
            ctx.mark_started(action.name()).await;
            info!(process = %process_name, action = action.name(), "action started");
            match run::run(&action, ctx.clone(), true).await {
                Ok(()) => {
                    let _ = tx.send(ActionEvent::Success(action.name().to_string()));
                }
                Err(err) => {
                    let _ = tx.send(ActionEvent::Failure(action.name().to_string(), err.source));
                }
            }
        });
    };

    // Initial scheduling.
    {
        let (conditions, started, completed) = context.logic_snapshot().await;
        let frame = logic_frame(&conditions, &started, &completed);
        for name in logic.initial_actions(&order, &frame) {
            spawn(&name, &mut active);
        }
    }

    if active.is_empty() {
        // No initial actions at all (e.g. an empty action list) — nothing
        // will ever drive progress, so this invocation is vacuously done.
        return Ok(context.results().await);
    }

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match event {
                    ActionEvent::Success(name) => {
                        active.remove(&name);
                        debug!(process = %process_name, action = %name, "action completed");

                        let (conditions, started, completed) = context.logic_snapshot().await;
                        let frame = logic_frame(&conditions, &started, &completed);
                        for next in logic.next_actions(&order, &frame) {
                            spawn(&next, &mut active);
                        }
                        // If logic didn't itself call stop() (e.g. transitions
                        // logic idling between states) the process simply
                        // waits here for the next event — an external
                        // update()/stop()/cancel() arrives on control_rx.
                    }
                    ActionEvent::Failure(name, source) => {
                        return abort(&process_name, &actions, &context, name, source).await;
                    }
                }
            }
            Some(ev) = control_rx.recv() => {
                match ev {
                    ControlEvent::Stop => {
                        if active.is_empty() {
                            fan_out_success(&process_name, &actions, &context).await;
                            return Ok(context.results().await);
                        }
                        // Actions keep running (not forcibly aborted); drain
                        // them before resolving.
                        return wait_out_active(
                            &process_name, &actions, &context, &mut active, &mut event_rx, StopOrCancel::Stop,
                        ).await;
                    }
                    ControlEvent::Cancel(data) => {
                        return wait_out_active(
                            &process_name, &actions, &context, &mut active, &mut event_rx, StopOrCancel::Cancel(data),
                        ).await;
                    }
                    ControlEvent::Update(conditions) => {
                        context.merge_conditions(conditions).await;
                        if active.is_empty() {
                            let (conditions, started, completed) = context.logic_snapshot().await;
                            let frame = logic_frame(&conditions, &started, &completed);
                            for next in logic.next_actions(&order, &frame) {
                                spawn(&next, &mut active);
                            }
                        }
                    }
                }
            }
        }
    }
}

enum StopOrCancel {
    Stop,
    Cancel(Value),
}

/// Once `stop()`/`cancel()` land while actions are still in flight, the
/// engine stops scheduling new work but does not forcibly abort what's
/// running (spec §5 "Cancellation"). This drains the event channel until
/// every active action reports in, then settles the handle.
async fn wait_out_active(
    process_name: &Arc<str>,
    actions: &Arc<HashMap<String, Arc<Action>>>,
    context: &Arc<Context>,
    active: &mut HashSet<String>,
    event_rx: &mut mpsc::UnboundedReceiver<ActionEvent>,
    outcome: StopOrCancel,
) -> Result<BTreeMap<String, Value>, ProcessError> {
    while !active.is_empty() {
        match event_rx.recv().await {
            Some(ActionEvent::Success(name)) => {
                active.remove(&name);
            }
            Some(ActionEvent::Failure(name, source)) => {
                // An in-flight action failed anyway while we were winding
                // down — still a failure; it takes priority over the
                // pending stop/cancel since it's a stronger conclusion.
                return abort(process_name, actions, context, name, source).await;
            }
            None => break,
        }
    }
    match outcome {
        StopOrCancel::Stop => {
            fan_out_success(process_name, actions, context).await;
            Ok(context.results().await)
        }
        StopOrCancel::Cancel(data) => {
            let shared: SharedError = Arc::new(CancelledError { data: data.clone() });
            fan_out_rollback_and_failure(process_name, actions, context, shared).await;
            Err(ProcessError::Cancelled {
                process: process_name.to_string(),
                data,
            })
        }
    }
}

async fn abort(
    process_name: &Arc<str>,
    actions: &Arc<HashMap<String, Arc<Action>>>,
    context: &Arc<Context>,
    failed_action: String,
    source: BoxError,
) -> Result<BTreeMap<String, Value>, ProcessError> {
    let completed = context.completed().await;
    let running = context.running().await;
    let shared: SharedError = Arc::from(source);

    fan_out_rollback_and_failure(process_name, actions, context, shared.clone()).await;

    Err(ProcessError::ActionFailure {
        action: failed_action,
        process: process_name.to_string(),
        completed,
        running,
        source: shared,
    })
}

/// Rollback for every started action, failure for every action — both
/// fire-and-forget and in parallel with each other (spec §4.4).
async fn fan_out_rollback_and_failure(
    process_name: &Arc<str>,
    actions: &Arc<HashMap<String, Arc<Action>>>,
    context: &Arc<Context>,
    error: SharedError,
) {
    let started: HashSet<String> = context.started().await.into_iter().collect();
    for (name, action) in actions.iter() {
        let action = action.clone();
        let ctx = context.clone();
        let err = error.clone();
        let process_name = process_name.clone();
        let was_started = started.contains(name);
        let name = name.clone();
        tokio::spawn(async move {
            if was_started {
                action.call_rollback(&ctx, err.clone()).await;
                debug!(process = %process_name, action = %name, "rollback complete");
            }
            action.call_failure(&ctx, err).await;
        });
    }
}

/// On normal resolution, `success()` runs on every action, fire-and-forget
/// (spec §4.4).
async fn fan_out_success(
    process_name: &Arc<str>,
    actions: &Arc<HashMap<String, Arc<Action>>>,
    context: &Arc<Context>,
) {
    for action in actions.values() {
        let action = action.clone();
        let ctx = context.clone();
        let process_name = process_name.clone();
        tokio::spawn(async move {
            action.call_success(&ctx).await;
            debug!(process = %process_name, action = %action.name(), "success hook complete");
        });
    }
}
