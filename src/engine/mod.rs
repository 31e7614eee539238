//! # Evaluation & Invalidation Engine
//!
//! [`Engine`] owns the compiled [`Schema`], the persistent [`Store`], and
//! the concrete-node LRU cache, and serializes every call that touches
//! them behind a single [`parking_lot::Mutex`]. `pull` and `invalidate`
//! are implemented in their own submodules; [`materialize`] is the shared
//! first step both of them run.

mod invalidate;
mod materialize;
mod pull;

use crate::error::{Error, Result};
use crate::node_key::NodeKey;
use crate::schema::{self, NodeDef, Schema};
use crate::storage::{BatchBuilder, Freshness, Store, Sublevel};
use crate::cache::ConcreteNodeCache;
use parking_lot::Mutex;
use serde_json::Value as Json;
use std::path::PathBuf;

/// Construction-time configuration for an [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of concrete nodes held in the instantiation cache.
    pub cache_capacity: usize,
    /// Filesystem path of the `sled` database backing persistent state.
    pub storage_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_capacity: 1024,
            storage_path: PathBuf::from("./increment-db"),
        }
    }
}

/// Mutable state touched by every `pull`/`invalidate` call, guarded by the
/// engine's single logical mutex.
struct EngineState {
    store: Store,
    cache: ConcreteNodeCache,
}

/// A persistent, demand-driven incremental computation engine.
///
/// Construct with [`Engine::open`], then call [`Engine::pull`] to demand a
/// node's current value and [`Engine::invalidate`] to mark a node (and
/// everything transitively depending on it) as needing re-examination.
pub struct Engine {
    schema: Schema,
    state: Mutex<EngineState>,
}

impl Engine {
    /// Compile `defs` into a [`Schema`] and open (or create) the `sled`
    /// database at `config.storage_path`. Construction fails fatally on
    /// any schema-validation error — an invalid schema never produces an
    /// engine.
    pub fn open(config: EngineConfig, defs: Vec<NodeDef>) -> Result<Self> {
        let schema = schema::compile(defs)?;
        log::info!(
            "compiled schema with {} head(s), schema_hash={}",
            schema.heads().count(),
            schema.hash()
        );

        let db = sled::open(&config.storage_path)
            .map_err(|e| Error::storage("open_db", config.storage_path.display().to_string(), e))?;
        let store = Store::open(db, schema.hash())?;
        let cache = ConcreteNodeCache::new(config.cache_capacity);

        Ok(Engine {
            schema,
            state: Mutex::new(EngineState { store, cache }),
        })
    }

    /// Demand the current value of a concrete node, recomputing as needed.
    pub fn pull(&self, head: &str, args: &[Json]) -> Result<Json> {
        let mut state = self.state.lock();
        let EngineState { store, cache } = &mut *state;
        let mut batch = BatchBuilder::new(store);
        let result = pull::pull(&self.schema, &mut batch, cache, head, args)?;
        batch.commit()?;
        log::debug!("pull({head}, {args:?}) -> {result:?}");
        Ok(result)
    }

    /// Mark a node, and every node transitively depending on it, as
    /// needing re-examination on its next `pull`.
    pub fn invalidate(&self, head: &str, args: &[Json]) -> Result<()> {
        let mut state = self.state.lock();
        let EngineState { store, cache } = &mut *state;
        let mut batch = BatchBuilder::new(store);
        invalidate::invalidate(&self.schema, &mut batch, cache, head, args)?;
        batch.commit()?;
        log::debug!("invalidate({head}, {args:?})");
        Ok(())
    }

    /// The node's current freshness bit, or `None` if it has never been
    /// materialized into storage.
    pub fn freshness(&self, head: &str, args: &[Json]) -> Result<Option<Freshness>> {
        let mut state = self.state.lock();
        let EngineState { store, cache } = &mut *state;
        let node = materialize::materialize(&self.schema, cache, head, args)?;
        store.get(Sublevel::Freshness, &node.key.encode()).and_then(|opt| match opt {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::corrupt("deserialize", node.key.encode(), e.to_string())),
        })
    }

    /// Every node key with a stored value, for debugging/inspection.
    pub fn list_materialized_nodes(&self) -> Result<Vec<NodeKey>> {
        let state = self.state.lock();
        state
            .store
            .keys(Sublevel::Values)?
            .into_iter()
            .map(|s| NodeKey::decode(&s))
            .collect()
    }

    /// The stable schema hash namespacing this engine's persistent state.
    pub fn schema_hash(&self) -> &str {
        self.schema.hash()
    }

    /// Drop every persistent sublevel for this engine's schema hash at
    /// once, discarding all materialized state, and consume the engine.
    /// Nodes are never deleted individually; this is the only supported
    /// cleanup path. Open a fresh [`Engine`] against the same storage path
    /// to start over with an empty schema-hash namespace.
    pub fn drop_schema(self) -> Result<()> {
        let state = self.state.lock();
        state.store.drop_schema()?;
        log::info!("dropped schema state for schema_hash={}", self.schema.hash());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ComputorOutput;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn temp_config() -> EngineConfig {
        let dir = tempfile::tempdir().unwrap();
        EngineConfig {
            cache_capacity: 16,
            storage_path: dir.into_path(),
        }
    }

    fn source(value: Arc<AtomicI64>, calls: Arc<AtomicUsize>) -> crate::value::BoxedComputor {
        Box::new(move |_inputs: &[Json], _prev: Option<&Json>, _bindings: &crate::value::Bindings| {
            calls.fetch_add(1, Ordering::SeqCst);
            ComputorOutput::Value(json!(value.load(Ordering::SeqCst)))
        })
    }

    fn doubling(calls: Arc<AtomicUsize>) -> crate::value::BoxedComputor {
        Box::new(move |inputs: &[Json], _prev: Option<&Json>, _bindings: &crate::value::Bindings| {
            calls.fetch_add(1, Ordering::SeqCst);
            ComputorOutput::Value(json!(inputs[0].as_i64().unwrap() * 2))
        })
    }

    #[test]
    fn scenario_1_source_plus_derived() {
        let a_value = Arc::new(AtomicI64::new(3));
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));

        let defs = vec![
            NodeDef::new("a", vec![], source(a_value.clone(), a_calls.clone())),
            NodeDef::new("b", vec!["a".to_string()], doubling(b_calls.clone())),
        ];
        let engine = Engine::open(temp_config(), defs).unwrap();

        assert_eq!(engine.pull("b", &[]).unwrap(), json!(6));
        let calls_after_first = b_calls.load(Ordering::SeqCst);
        assert_eq!(calls_after_first, 1);

        assert_eq!(engine.pull("b", &[]).unwrap(), json!(6));
        assert_eq!(b_calls.load(Ordering::SeqCst), calls_after_first, "second pull must not recompute");
    }

    #[test]
    fn scenario_2_invalidation_propagation() {
        let a_value = Arc::new(AtomicI64::new(3));
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));

        let defs = vec![
            NodeDef::new("a", vec![], source(a_value.clone(), a_calls.clone())),
            NodeDef::new("b", vec!["a".to_string()], doubling(b_calls.clone())),
        ];
        let engine = Engine::open(temp_config(), defs).unwrap();

        assert_eq!(engine.pull("b", &[]).unwrap(), json!(6));

        engine.invalidate("a", &[]).unwrap();
        a_value.store(4, Ordering::SeqCst);
        // Re-pulling `a` directly forces its computor to run with the new value.
        assert_eq!(engine.pull("a", &[]).unwrap(), json!(4));

        assert_eq!(engine.pull("b", &[]).unwrap(), json!(8));
    }

    #[test]
    fn scenario_3_unchanged_suppresses_counter_bump() {
        let a_value = Arc::new(AtomicI64::new(3));
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));
        let c_calls = Arc::new(AtomicUsize::new(0));

        // `b` treats any positive `a` as equivalent to the previous value.
        let b_calls_clone = b_calls.clone();
        let b_computor: crate::value::BoxedComputor = Box::new(move |inputs: &[Json], prev: Option<&Json>, _: &crate::value::Bindings| {
            b_calls_clone.fetch_add(1, Ordering::SeqCst);
            let positive = inputs[0].as_i64().unwrap() > 0;
            if positive && prev.is_some() {
                ComputorOutput::Unchanged
            } else {
                ComputorOutput::Value(json!(inputs[0].as_i64().unwrap() * 2))
            }
        });

        let defs = vec![
            NodeDef::new("a", vec![], source(a_value.clone(), a_calls.clone())),
            NodeDef::new("b", vec!["a".to_string()], b_computor),
            NodeDef::new("c", vec!["b".to_string()], doubling(c_calls.clone())),
        ];
        let engine = Engine::open(temp_config(), defs).unwrap();

        assert_eq!(engine.pull("c", &[]).unwrap(), json!(12)); // c = 2*b = 2*6
        let c_calls_after_first = c_calls.load(Ordering::SeqCst);

        engine.invalidate("a", &[]).unwrap();
        a_value.store(5, Ordering::SeqCst);
        engine.pull("a", &[]).unwrap();

        assert_eq!(engine.pull("b", &[]).unwrap(), json!(6), "b reuses its previous value");
        assert_eq!(engine.pull("c", &[]).unwrap(), json!(12));
        assert_eq!(
            c_calls.load(Ordering::SeqCst),
            c_calls_after_first,
            "c must still skip recomputation since b's counter did not change"
        );
    }

    #[test]
    fn scenario_6_arity_mismatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let defs = vec![NodeDef::new(
            "f(x)",
            vec![],
            doubling(calls),
        )];
        let engine = Engine::open(temp_config(), defs).unwrap();
        let err = engine.pull("f", &[]).unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { .. }));
    }

    #[test]
    fn rejects_pattern_passed_as_runtime_head() {
        let calls = Arc::new(AtomicUsize::new(0));
        let defs = vec![NodeDef::new("user(u)", vec![], doubling(calls))];
        let engine = Engine::open(temp_config(), defs).unwrap();
        let err = engine.pull("user(u)", &[json!("u1")]).unwrap_err();
        assert!(matches!(err, Error::SchemaPatternNotAllowed(_)));
    }

    #[test]
    fn missing_node_is_invalid() {
        let defs: Vec<NodeDef> = vec![];
        let engine = Engine::open(temp_config(), defs).unwrap();
        let err = engine.pull("nope", &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidNode(_)));
    }

    #[test]
    fn drop_schema_clears_all_materialized_state() {
        let a_value = Arc::new(AtomicI64::new(3));
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));

        let config = temp_config();
        let defs = vec![
            NodeDef::new("a", vec![], source(a_value.clone(), a_calls.clone())),
            NodeDef::new("b", vec!["a".to_string()], doubling(b_calls.clone())),
        ];
        let engine = Engine::open(config.clone(), defs).unwrap();

        assert_eq!(engine.pull("b", &[]).unwrap(), json!(6));
        assert_eq!(engine.freshness("b", &[]).unwrap(), Some(Freshness::UpToDate));
        assert!(!engine.list_materialized_nodes().unwrap().is_empty());

        engine.drop_schema().unwrap();

        // Reopening against the same storage path and schema starts from
        // an empty schema-hash namespace.
        let defs = vec![
            NodeDef::new("a", vec![], source(a_value.clone(), a_calls.clone())),
            NodeDef::new("b", vec!["a".to_string()], doubling(b_calls.clone())),
        ];
        let reopened = Engine::open(config, defs).unwrap();
        assert_eq!(reopened.freshness("b", &[]).unwrap(), None);
        assert!(reopened.list_materialized_nodes().unwrap().is_empty());
        assert_eq!(reopened.pull("b", &[]).unwrap(), json!(6));
    }
}
