use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::context::ControlHandle;

/// The read-only slice of process state a [`ProcessLogic`] selector needs
/// to decide which actions run next (spec §3.2).
pub struct LogicFrame<'a> {
    pub conditions: &'a Map<String, Value>,
    pub started: &'a [String],
    pub completed: &'a [String],
    /// Lets a logic implementation call `stop()` itself — `DependenciesLogic`
    /// uses this to end the process once every action has completed.
    pub control: ControlHandle,
}

/// Pluggable component deciding which actions a process runs initially and
/// after each completion (spec §3.2). All three methods default to the
/// empty/no-op behavior described there.
pub trait ProcessLogic: Send + Sync {
    fn initial_actions(&self, _actions: &[String], _frame: &LogicFrame<'_>) -> Vec<String> {
        Vec::new()
    }

    fn next_actions(&self, _actions: &[String], _frame: &LogicFrame<'_>) -> Vec<String> {
        Vec::new()
    }

    fn context_from_args(&self, _args: &[Value]) -> Map<String, Value> {
        Map::new()
    }
}

/// Workflow / DAG logic: starts (and restarts) every action whose
/// prerequisites are all in `completed` and which hasn't started yet.
/// Calls `stop()` once every action has completed (spec §3.2 item 1,
/// §4.6).
pub struct DependenciesLogic {
    deps: HashMap<String, Vec<String>>,
}

impl DependenciesLogic {
    pub fn new(deps: HashMap<String, Vec<String>>) -> Self {
        if let Some(cycle) = detect_cycle(&deps) {
            warn!(
                ?cycle,
                "dependencies graph has a cycle; process will idle forever unless stopped or cancelled externally"
            );
        }
        Self { deps }
    }

    fn eligible(&self, actions: &[String], frame: &LogicFrame<'_>) -> Vec<String> {
        actions
            .iter()
            .filter(|name| !frame.started.iter().any(|s| &s == name))
            .filter(|name| {
                self.deps
                    .get(*name)
                    .map(|prereqs| prereqs.iter().all(|p| frame.completed.iter().any(|c| c == p)))
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }
}

impl ProcessLogic for DependenciesLogic {
    fn initial_actions(&self, actions: &[String], frame: &LogicFrame<'_>) -> Vec<String> {
        self.eligible(actions, frame)
    }

    fn next_actions(&self, actions: &[String], frame: &LogicFrame<'_>) -> Vec<String> {
        if frame.completed.len() >= actions.len() {
            frame.control.stop();
            return Vec::new();
        }
        self.eligible(actions, frame)
    }
}

/// Depth-first cycle detection over the prerequisite graph. Returns the
/// path that closed the cycle, for the warning message.
fn detect_cycle(deps: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        node: &str,
        deps: &HashMap<String, Vec<String>>,
        marks: &mut HashMap<String, Mark>,
        path: &mut Vec<String>,
    ) -> bool {
        match marks.get(node) {
            Some(Mark::Done) => return false,
            Some(Mark::Visiting) => return true,
            None => {}
        }
        marks.insert(node.to_string(), Mark::Visiting);
        path.push(node.to_string());
        if let Some(prereqs) = deps.get(node) {
            for p in prereqs {
                if visit(p, deps, marks, path) {
                    return true;
                }
            }
        }
        marks.insert(node.to_string(), Mark::Done);
        path.pop();
        false
    }

    let mut marks = HashMap::new();
    for node in deps.keys() {
        let mut path = Vec::new();
        if visit(node, deps, &mut marks, &mut path) {
            return Some(path);
        }
    }
    None
}

/// A `(from, to, predicate?)` triple (spec glossary: "Transition").
#[derive(Clone)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub predicate: Option<Predicate>,
}

impl Transition {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            predicate: None,
        }
    }

    pub fn guarded(
        from: impl Into<String>,
        to: impl Into<String>,
        predicate: impl Fn(&Map<String, Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            predicate: Some(Arc::new(predicate)),
        }
    }
}

pub type Predicate = Arc<dyn Fn(&Map<String, Value>) -> bool + Send + Sync>;

/// Reserved condition key under which `TransitionsLogic::context_from_args`
/// stashes the initial state name it scanned from the caller's arguments
/// (spec §3.2: "the first string as the initial state name").
pub const INITIAL_STATE_KEY: &str = "$initial_state";

/// State-machine logic: exactly one action runs at a time, chosen by
/// scanning `criteria` for the first transition whose `from` matches the
/// last completed action and whose predicate (if any) holds against the
/// current conditions (spec §3.2 item 2, §4.5).
pub struct TransitionsLogic {
    transitions: Vec<Transition>,
}

impl TransitionsLogic {
    pub fn new(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }
}

impl ProcessLogic for TransitionsLogic {
    fn context_from_args(&self, args: &[Value]) -> Map<String, Value> {
        let mut conditions = Map::new();
        if let Some(Value::String(initial)) = args.iter().find(|a| a.is_string()) {
            conditions.insert(INITIAL_STATE_KEY.to_string(), Value::String(initial.clone()));
        }
        if let Some(Value::Object(extra)) = args.iter().find(|a| a.is_object()) {
            for (k, v) in extra {
                conditions.insert(k.clone(), v.clone());
            }
        }
        conditions
    }

    fn initial_actions(&self, actions: &[String], frame: &LogicFrame<'_>) -> Vec<String> {
        if actions.is_empty() {
            return Vec::new();
        }
        if let Some(Value::String(name)) = frame.conditions.get(INITIAL_STATE_KEY) {
            if actions.iter().any(|a| a == name) {
                return vec![name.clone()];
            }
        }
        vec![actions[0].clone()]
    }

    fn next_actions(&self, actions: &[String], frame: &LogicFrame<'_>) -> Vec<String> {
        let Some(last) = frame.completed.last() else {
            return Vec::new();
        };
        for t in &self.transitions {
            if &t.from != last {
                continue;
            }
            let holds = match &t.predicate {
                Some(p) => p(frame.conditions),
                None => true,
            };
            if holds && actions.iter().any(|a| a == &t.to) {
                return vec![t.to.clone()];
            }
        }
        Vec::new()
    }
}
