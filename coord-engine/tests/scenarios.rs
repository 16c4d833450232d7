use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use coord_engine::{action, create, ActionBuilder, Transition, TransitionsLogic};
use coord_engine::{BoxError, Context, DependenciesLogic, ProcessError};
use serde_json::{json, Map, Value};

fn push(log: &Arc<Mutex<Vec<String>>>, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

/// S5: `{B:[A], C:[B,D]}` — A and D are independent and may run in either
/// order, B waits on A, C waits on both B and D. The process must end with
/// all four completed and results for every action.
#[tokio::test]
async fn dependencies_workflow_runs_to_completion_in_a_valid_order() {
    let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let make = |name: &'static str, order: Arc<Mutex<Vec<String>>>| {
        action(name, move |frame| {
            let order = order.clone();
            async move {
                order.lock().unwrap().push(frame.name.clone());
                Ok(json!({ "done": frame.name }))
            }
        })
    };

    let a = make("A", order.clone());
    let b = make("B", order.clone());
    let c = make("C", order.clone());
    let d = make("D", order.clone());

    let mut deps = HashMap::new();
    deps.insert("B".to_string(), vec!["A".to_string()]);
    deps.insert("C".to_string(), vec!["B".to_string(), "D".to_string()]);

    let process = create("workflow", vec![a, b, c, d], Arc::new(DependenciesLogic::new(deps)));
    let execution = process.start(vec![Value::Null]);
    let results = execution.wait().await.expect("workflow should not fail");

    assert_eq!(results.len(), 4);
    for name in ["A", "B", "C", "D"] {
        assert!(results.contains_key(name), "missing result for {name}");
    }

    let finished = order.lock().unwrap().clone();
    let pos = |n: &str| finished.iter().position(|x| x == n).unwrap();
    assert!(pos("B") > pos("A"), "B must finish after A: {finished:?}");
    assert!(pos("C") > pos("B"), "C must finish after B: {finished:?}");
    assert!(pos("C") > pos("D"), "C must finish after D: {finished:?}");
}

fn state_machine_process() -> coord_engine::Process {
    let start = action("start", |frame| async move { Ok(json!({ "ran": frame.name })) });
    let middle = action("middle", |frame| async move { Ok(json!({ "ran": frame.name })) });
    let end = action("end", |frame| async move { Ok(json!({ "ran": frame.name })) });

    let transitions = vec![
        Transition::new("start", "middle"),
        Transition::guarded("middle", "end", |conditions| {
            conditions.get("needed").and_then(Value::as_bool).unwrap_or(false)
        }),
    ];

    create(
        "state-machine",
        vec![start, middle, end],
        Arc::new(TransitionsLogic::new(transitions)),
    )
}

/// S6 without the guard: the machine reaches `middle` and stalls there —
/// `end` never becomes eligible.
#[tokio::test]
async fn transitions_logic_stalls_without_the_guard_condition() {
    let process = state_machine_process();
    let execution = process.start(vec![Value::String("start".to_string())]);
    tokio::time::sleep(Duration::from_millis(20)).await;
    execution.stop();
    let results = execution.wait().await.expect("stop() should resolve cleanly");

    assert!(results.contains_key("start"));
    assert!(results.contains_key("middle"));
    assert!(!results.contains_key("end"));
}

/// S6 with the guard: supplying `needed: true` lets the machine reach `end`.
#[tokio::test]
async fn transitions_logic_advances_when_the_guard_condition_holds() {
    let process = state_machine_process();
    let execution = process.start(vec![
        Value::String("start".to_string()),
        json!({ "needed": true }),
    ]);
    tokio::time::sleep(Duration::from_millis(20)).await;
    execution.stop();
    let results = execution.wait().await.expect("stop() should resolve cleanly");

    assert!(results.contains_key("start"));
    assert!(results.contains_key("middle"));
    assert!(results.contains_key("end"));
}

/// S7: X succeeds, Y fails (with a rollback hook), Z depends on Y and so
/// never starts. Rollback fires only for actions that actually started
/// (X, Y — not Z); failure fires for every action (X, Y, Z); success never
/// fires at all.
#[tokio::test]
async fn action_failure_rolls_back_started_actions_and_skips_never_started_ones() {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let x = ActionBuilder::new("X")
        .on_execute({
            let log = log.clone();
            move |frame| {
                let log = log.clone();
                async move {
                    push(&log, "execute:X");
                    Ok(json!({ "ran": frame.name }))
                }
            }
        })
        .on_rollback({
            let log = log.clone();
            move |_frame, _err| {
                let log = log.clone();
                async move { push(&log, "rollback:X") }
            }
        })
        .on_failure({
            let log = log.clone();
            move |_frame, _err| {
                let log = log.clone();
                async move { push(&log, "failure:X") }
            }
        })
        .on_success({
            let log = log.clone();
            move |_frame| {
                let log = log.clone();
                async move { push(&log, "success:X") }
            }
        })
        .build();

    let y = ActionBuilder::new("Y")
        .on_execute({
            let log = log.clone();
            move |_frame| {
                let log = log.clone();
                async move {
                    push(&log, "execute:Y");
                    let err: BoxError = Box::new(io::Error::new(io::ErrorKind::Other, "Y blew up"));
                    Err(err)
                }
            }
        })
        .on_rollback({
            let log = log.clone();
            move |_frame, _err| {
                let log = log.clone();
                async move { push(&log, "rollback:Y") }
            }
        })
        .on_failure({
            let log = log.clone();
            move |_frame, _err| {
                let log = log.clone();
                async move { push(&log, "failure:Y") }
            }
        })
        .build();

    let z = ActionBuilder::new("Z")
        .on_execute({
            let log = log.clone();
            move |frame| {
                let log = log.clone();
                async move {
                    push(&log, "execute:Z");
                    Ok(json!({ "ran": frame.name }))
                }
            }
        })
        .on_rollback({
            let log = log.clone();
            move |_frame, _err| {
                let log = log.clone();
                async move { push(&log, "rollback:Z") }
            }
        })
        .on_failure({
            let log = log.clone();
            move |_frame, _err| {
                let log = log.clone();
                async move { push(&log, "failure:Z") }
            }
        })
        .build();

    let mut deps = HashMap::new();
    deps.insert("Y".to_string(), vec!["X".to_string()]);
    deps.insert("Z".to_string(), vec!["Y".to_string()]);

    let process = create("rollback-demo", vec![x, y, z], Arc::new(DependenciesLogic::new(deps)));
    let execution = process.start(vec![Value::Null]);
    let err = execution.wait().await.expect_err("Y's failure should abort the process");

    match &err {
        ProcessError::ActionFailure { action, completed, running, .. } => {
            assert_eq!(action, "Y");
            assert!(completed.iter().any(|n| n == "X"));
            assert!(running.iter().any(|n| n == "Y"));
        }
        other => panic!("expected ActionFailure, got {other:?}"),
    }

    // Rollback/failure hooks are fire-and-forget; give them a moment to run.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = log.lock().unwrap().clone();

    assert!(events.contains(&"rollback:X".to_string()));
    assert!(events.contains(&"rollback:Y".to_string()));
    assert!(!events.contains(&"rollback:Z".to_string()), "Z never started, must not roll back");

    assert!(events.contains(&"failure:X".to_string()));
    assert!(events.contains(&"failure:Y".to_string()));
    assert!(events.contains(&"failure:Z".to_string()));

    assert!(!events.iter().any(|e| e.starts_with("success:")), "success must never fire on failure");
    assert!(!events.contains(&"execute:Z".to_string()), "Z must never have started");
}

/// `run()` composes one action's init/execute/retry loop outside of a full
/// `Process` — exercised here directly against a standalone `Context`.
#[tokio::test]
async fn run_drives_a_single_action_without_a_process() {
    let attempts: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));

    let flaky = ActionBuilder::new("flaky")
        .on_execute({
            let attempts = attempts.clone();
            move |frame| {
                let attempts = attempts.clone();
                async move {
                    let mut count = attempts.lock().unwrap();
                    *count += 1;
                    if *count < 2 {
                        let err: BoxError = Box::new(io::Error::new(io::ErrorKind::Other, "not yet"));
                        Err(err)
                    } else {
                        Ok(json!({ "ran": frame.name }))
                    }
                }
            }
        })
        .on_retry(|_frame, _err| async move { Ok(()) })
        .build();

    let context = Arc::new(Context::standalone(vec![Value::Null], Map::new()));
    coord_engine::run(&flaky, context.clone(), true)
        .await
        .expect("retry should let the second attempt succeed");

    assert_eq!(*attempts.lock().unwrap(), 2);
    let results = context.results().await;
    assert_eq!(results.get("flaky"), Some(&json!({ "ran": "flaky" })));
}

/// §4.5 "idle-between -> running-one: on update()" — a transitions-logic
/// process stalled at `middle` (no guard set) advances to `end` once an
/// external `update()` supplies the missing condition, with no further
/// actions required to complete it.
#[tokio::test]
async fn update_unblocks_a_stalled_transitions_logic_process() {
    let process = state_machine_process();
    let execution = process.start(vec![Value::String("start".to_string())]);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(execution.context().completed().await.contains(&"middle".to_string()));
    assert!(!execution.context().completed().await.contains(&"end".to_string()));

    let mut conditions = Map::new();
    conditions.insert("needed".to_string(), Value::Bool(true));
    execution.update(Some(conditions));

    tokio::time::sleep(Duration::from_millis(20)).await;
    execution.stop();
    let results = execution.wait().await.expect("stop() should resolve cleanly");

    assert!(results.contains_key("start"));
    assert!(results.contains_key("middle"));
    assert!(results.contains_key("end"));
}

/// §4.7 `cancel(data)` — cancelling an idle process (stalled at `middle`,
/// nothing in flight) rejects immediately with the supplied payload and
/// still fans rollback/failure out to every action.
#[tokio::test]
async fn cancel_rejects_with_the_supplied_data() {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let make = |name: &'static str, log: Arc<Mutex<Vec<String>>>| {
        ActionBuilder::new(name)
            .on_execute(|frame| async move { Ok(json!({ "ran": frame.name })) })
            .on_rollback({
                let log = log.clone();
                move |frame, _err| {
                    let log = log.clone();
                    async move { push(&log, format!("rollback:{}", frame.name)) }
                }
            })
            .on_failure({
                let log = log.clone();
                move |frame, _err| {
                    let log = log.clone();
                    async move { push(&log, format!("failure:{}", frame.name)) }
                }
            })
            .build()
    };

    let transitions = vec![Transition::new("start", "middle")];
    let process = create(
        "cancel-demo",
        vec![make("start", log.clone()), make("middle", log.clone())],
        Arc::new(TransitionsLogic::new(transitions)),
    );

    let execution = process.start(vec![Value::String("start".to_string())]);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(execution.context().completed().await.contains(&"middle".to_string()));

    execution.cancel(Some(json!({ "reason": "operator abort" })));
    let err = execution.wait().await.expect_err("cancel() must reject the execution");

    match err {
        ProcessError::Cancelled { process, data } => {
            assert_eq!(process, "cancel-demo");
            assert_eq!(data, json!({ "reason": "operator abort" }));
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = log.lock().unwrap().clone();
    assert!(events.contains(&"rollback:start".to_string()));
    assert!(events.contains(&"rollback:middle".to_string()));
    assert!(events.contains(&"failure:start".to_string()));
    assert!(events.contains(&"failure:middle".to_string()));
}
