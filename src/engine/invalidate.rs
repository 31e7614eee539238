//! # Invalidation Engine — `invalidate`
//!
//! Marks the target node `potentially-outdated`, then BFS over the
//! reverse-dependency graph, downgrading any `up-to-date` dependent and
//! continuing through it, while stopping at any dependent that is already
//! `potentially-outdated` or has never been materialized. A visited-set
//! bounds the traversal to linear time in the size of the dependent set,
//! even when the dependency DAG has diamond shapes.

use crate::cache::ConcreteNodeCache;
use crate::error::Result;
use crate::schema::Schema;
use crate::storage::{BatchBuilder, Freshness, InputsRecord};
use serde_json::Value as Json;
use std::collections::{HashSet, VecDeque};

/// Run `invalidate(head, args)` to completion against a shared batch.
pub fn invalidate(
    schema: &Schema,
    batch: &mut BatchBuilder<'_>,
    cache: &mut ConcreteNodeCache,
    head: &str,
    args: &[Json],
) -> Result<()> {
    let node = super::materialize::materialize(schema, cache, head, args)?;
    let key = node.key.encode();

    // 1. Ensure the node is recorded in storage with an inputs-record
    // (current input counters if derived, empty if a source node).
    if batch.get_inputs_record(&key)?.is_none() {
        let mut input_keys = Vec::with_capacity(node.inputs.len());
        let mut input_counters = Vec::with_capacity(node.inputs.len());
        for input in &node.inputs {
            let encoded = input.encode();
            let counter = batch.get_counter(&encoded)?.unwrap_or(0);
            input_keys.push(encoded);
            input_counters.push(counter);
        }
        batch.put_inputs_record(
            &key,
            &InputsRecord {
                inputs: input_keys,
                input_counters,
            },
        )?;
    }

    // 2. Mark potentially-outdated.
    batch.put_freshness(&key, Freshness::PotentiallyOutdated)?;

    // 3. BFS-propagate through the reverse-dependency graph.
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(key.clone());
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(key);

    while let Some(current) = queue.pop_front() {
        for dependent in batch.get_revdeps(&current)? {
            if !visited.insert(dependent.clone()) {
                continue;
            }
            if let Some(Freshness::UpToDate) = batch.get_freshness(&dependent)? {
                batch.put_freshness(&dependent, Freshness::PotentiallyOutdated)?;
                queue.push_back(dependent);
            }
            // Already `potentially-outdated` or never materialized: the
            // visited-set entry above is enough to stop us descending
            // through this branch again.
        }
    }

    Ok(())
}
