//! Runs a small four-action dependency workflow to completion and prints
//! the order actions finished in plus their collected results. Actions
//! share a `coord-signals` semaphore so at most two of them ever execute
//! at once, regardless of how many the dependency graph makes eligible
//! at the same time.

use std::collections::HashMap;
use std::sync::Arc;

use coord_engine::{action, create, DependenciesLogic};
use coord_signals::{semaphore, Semaphore};
use serde_json::{json, Value};

fn bounded_action(name: &'static str, gate: Arc<Semaphore>) -> coord_engine::Action {
    action(name, move |frame| {
        let gate = gate.clone();
        async move {
            gate.wait().await;
            let result = json!({ "ran": frame.name });
            gate.release(1).await;
            Ok(result)
        }
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let gate = Arc::new(semaphore(2));
    let a = bounded_action("A", gate.clone());
    let b = bounded_action("B", gate.clone());
    let c = bounded_action("C", gate.clone());
    let d = bounded_action("D", gate.clone());

    let mut deps = HashMap::new();
    deps.insert("B".to_string(), vec!["A".to_string()]);
    deps.insert("C".to_string(), vec!["B".to_string(), "D".to_string()]);

    let logic = Arc::new(DependenciesLogic::new(deps));
    let process = create("demo-workflow", vec![a, b, c, d], logic);

    let execution = process.start(vec![Value::Null]);
    match execution.wait().await {
        Ok(results) => {
            println!("workflow finished with {} results:", results.len());
            for (name, value) in results {
                println!("  {name} -> {value}");
            }
        }
        Err(err) => eprintln!("workflow failed: {err}"),
    }
}
