//! Runs a three-state machine (`start` -> `middle` -> `end`) twice: once
//! with the guard condition unset (the machine stalls in `middle`) and
//! once with it set (the machine reaches `end`).

use std::sync::Arc;

use coord_engine::{action, create, Transition, TransitionsLogic};
use serde_json::{json, Value};

fn build_process() -> coord_engine::Process {
    let start = action("start", |frame| async move {
        Ok(json!({ "ran": frame.name }))
    });
    let middle = action("middle", |frame| async move {
        Ok(json!({ "ran": frame.name }))
    });
    let end = action("end", |frame| async move {
        Ok(json!({ "ran": frame.name }))
    });

    let transitions = vec![
        Transition::new("start", "middle"),
        Transition::guarded("middle", "end", |conditions| {
            conditions.get("needed").and_then(Value::as_bool).unwrap_or(false)
        }),
    ];

    create(
        "demo-state-machine",
        vec![start, middle, end],
        Arc::new(TransitionsLogic::new(transitions)),
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    println!("-- without the guard condition --");
    let process = build_process();
    let execution = process.start(vec![Value::String("start".to_string())]);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    execution.stop();
    match execution.wait().await {
        Ok(results) => println!("stopped in middle, results so far: {results:?}"),
        Err(err) => eprintln!("unexpected error: {err}"),
    }

    println!("-- with the guard condition --");
    let process = build_process();
    let execution = process.start(vec![
        Value::String("start".to_string()),
        json!({ "needed": true }),
    ]);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    execution.stop();
    match execution.wait().await {
        Ok(results) => println!("reached end, results: {results:?}"),
        Err(err) => eprintln!("unexpected error: {err}"),
    }
}
