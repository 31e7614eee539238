// Integration test for scoped invalidation of parameterized nodes.

use increment::value::{Bindings, ComputorOutput};
use increment::{Engine, EngineConfig, NodeDef};
use serde_json::{json, Value as Json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn temp_engine(defs: Vec<NodeDef>) -> Engine {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        cache_capacity: 64,
        storage_path: dir.into_path(),
    };
    Engine::open(config, defs).unwrap()
}

#[test]
fn invalidating_one_parameterized_input_only_dirties_its_dependents() {
    // item(i) reads from a shared source table keyed by i.
    let source: Arc<Mutex<HashMap<String, i64>>> = Arc::new(Mutex::new(HashMap::new()));
    source.lock().unwrap().insert("x".to_string(), 10);
    source.lock().unwrap().insert("y".to_string(), 20);

    let item_calls = Arc::new(AtomicUsize::new(0));
    let paired_calls = Arc::new(AtomicUsize::new(0));

    let source_for_item = source.clone();
    let item_calls_clone = item_calls.clone();
    let item_computor = move |_inputs: &[Json], _prev: Option<&Json>, bindings: &Bindings| {
        item_calls_clone.fetch_add(1, Ordering::SeqCst);
        let i = bindings.get("i").unwrap().as_str().unwrap().to_string();
        let value = *source_for_item.lock().unwrap().get(&i).unwrap();
        ComputorOutput::Value(json!(value))
    };

    let paired_calls_clone = paired_calls.clone();
    let paired_computor = move |inputs: &[Json], _prev: Option<&Json>, _bindings: &Bindings| {
        paired_calls_clone.fetch_add(1, Ordering::SeqCst);
        let sum = inputs[0].as_i64().unwrap() + inputs[1].as_i64().unwrap();
        ComputorOutput::Value(json!(sum))
    };

    let defs = vec![
        NodeDef::new("item(i)", vec![], Box::new(item_computor)),
        NodeDef::new("paired(i)", vec!["item(i)".to_string(), "item(i)".to_string()], Box::new(paired_computor)),
    ];
    let engine = temp_engine(defs);

    assert_eq!(engine.pull("paired", &[json!("x")]).unwrap(), json!(20));
    assert_eq!(engine.pull("paired", &[json!("y")]).unwrap(), json!(40));

    let paired_calls_after_first = paired_calls.load(Ordering::SeqCst);
    assert_eq!(paired_calls_after_first, 2);

    // Change the underlying source for "x" only, then invalidate item(x).
    source.lock().unwrap().insert("x".to_string(), 11);
    engine.invalidate("item", &[json!("x")]).unwrap();

    // paired(y) must still be up-to-date: re-pulling it must not recompute.
    assert_eq!(engine.pull("paired", &[json!("y")]).unwrap(), json!(40));
    assert_eq!(
        paired_calls.load(Ordering::SeqCst),
        paired_calls_after_first,
        "paired(y) must not have been re-examined by invalidating item(x)"
    );

    // paired(x) must recompute to reflect the new source value.
    assert_eq!(engine.pull("paired", &[json!("x")]).unwrap(), json!(22));
    assert_eq!(paired_calls.load(Ordering::SeqCst), paired_calls_after_first + 1);
}
