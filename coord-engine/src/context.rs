use serde_json::{Map, Value};
use tokio::sync::{mpsc, RwLock};

/// Messages sent from a [`ControlHandle`] (held by the execution handle and
/// by every action's `context`) to the running process loop.
pub(crate) enum ControlEvent {
    Stop,
    Cancel(Value),
    Update(Map<String, Value>),
}

/// The three control operations, shared identity between `Context` and
/// `Execution` (spec: "same identity as those on the returned promise").
/// Sending is synchronous and non-blocking — a stopped or dropped process
/// simply drops the message, which is what makes `stop()`/`cancel()`
/// idempotent beyond their first effect.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlEvent>,
}

impl ControlHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ControlEvent>) -> Self {
        Self { tx }
    }

    pub fn stop(&self) {
        let _ = self.tx.send(ControlEvent::Stop);
    }

    pub fn cancel(&self, data: Option<Value>) {
        let _ = self
            .tx
            .send(ControlEvent::Cancel(data.unwrap_or(Value::Null)));
    }

    pub fn update(&self, conditions: Option<Map<String, Value>>) {
        let _ = self
            .tx
            .send(ControlEvent::Update(conditions.unwrap_or_default()));
    }
}

struct MutableState {
    conditions: Map<String, Value>,
    results: std::collections::BTreeMap<String, Value>,
    started: Vec<String>,
    completed: Vec<String>,
}

/// The per-process frame shared across every hook of every action in one
/// process invocation (spec §3.2).
pub struct Context {
    /// The arguments the caller passed to `start()`. Read-only after
    /// creation.
    pub args: Vec<Value>,
    state: RwLock<MutableState>,
    control: ControlHandle,
}

impl Context {
    pub(crate) fn new(
        args: Vec<Value>,
        seeded_conditions: Map<String, Value>,
        control: ControlHandle,
    ) -> Self {
        Self {
            args,
            state: RwLock::new(MutableState {
                conditions: seeded_conditions,
                results: std::collections::BTreeMap::new(),
                started: Vec::new(),
                completed: Vec::new(),
            }),
            control,
        }
    }

    /// Builds a bare `Context` with no process loop behind it, for driving
    /// [`crate::run`] directly against a single action (spec §6 item 5).
    /// `stop()`/`cancel()`/`update()` are harmless no-ops here — nothing is
    /// listening on the control channel since there's no `run_process` loop
    /// to receive it.
    pub fn standalone(args: Vec<Value>, conditions: Map<String, Value>) -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self::new(args, conditions, ControlHandle::new(tx))
    }

    pub async fn conditions(&self) -> Map<String, Value> {
        self.state.read().await.conditions.clone()
    }

    pub async fn results(&self) -> std::collections::BTreeMap<String, Value> {
        self.state.read().await.results.clone()
    }

    pub async fn started(&self) -> Vec<String> {
        self.state.read().await.started.clone()
    }

    pub async fn completed(&self) -> Vec<String> {
        self.state.read().await.completed.clone()
    }

    /// Names started but not yet completed.
    pub async fn running(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .started
            .iter()
            .filter(|n| !state.completed.contains(n))
            .cloned()
            .collect()
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn cancel(&self, data: Option<Value>) {
        self.control.cancel(data);
    }

    pub fn update(&self, conditions: Option<Map<String, Value>>) {
        self.control.update(conditions);
    }

    pub(crate) fn control_handle(&self) -> ControlHandle {
        self.control.clone()
    }

    pub(crate) async fn mark_started(&self, name: &str) {
        let mut state = self.state.write().await;
        state.started.push(name.to_string());
    }

    pub(crate) async fn mark_completed(&self, name: &str, result: Value) {
        let mut state = self.state.write().await;
        state.completed.push(name.to_string());
        state.results.insert(name.to_string(), result);
    }

    pub(crate) async fn merge_conditions(&self, extra: Map<String, Value>) {
        let mut state = self.state.write().await;
        for (k, v) in extra {
            state.conditions.insert(k, v);
        }
    }

    /// A consistent snapshot of the fields the logic's selectors read.
    pub(crate) async fn logic_snapshot(&self) -> (Map<String, Value>, Vec<String>, Vec<String>) {
        let state = self.state.read().await;
        (
            state.conditions.clone(),
            state.started.clone(),
            state.completed.clone(),
        )
    }
}
