//! # Evaluation Engine — `pull`
//!
//! Materializes the node, returns its value from the fast path if it is
//! already up-to-date, otherwise recurses into its inputs and either skips
//! recomputation (when every input counter still matches the last-seen
//! snapshot) or invokes the computor. A single [`BatchBuilder`] is opened
//! once per top-level `pull` call and threaded through every recursive
//! descent into a node's inputs, so the whole demand-evaluation tree
//! commits as one atomic batch; the engine mutex (held by the caller in
//! [`crate::engine::Engine::pull`]) is what prevents a concurrent
//! `invalidate` from observing or corrupting an in-flight counter-skip
//! decision.

use crate::cache::ConcreteNodeCache;
use crate::error::{Error, Result};
use crate::node_key::NodeKey;
use crate::schema::Schema;
use crate::storage::{BatchBuilder, Freshness, InputsRecord};
use crate::value::{Bindings, ComputorOutput};
use serde_json::Value as Json;
use std::collections::HashMap;

/// Run `pull(head, args)` to completion, recursing into inputs as needed,
/// and return the node's current value.
pub fn pull(
    schema: &Schema,
    batch: &mut BatchBuilder<'_>,
    cache: &mut ConcreteNodeCache,
    head: &str,
    args: &[Json],
) -> Result<Json> {
    let node = super::materialize::materialize(schema, cache, head, args)?;
    let key = node.key.encode();

    // 2. Fast path.
    if let Some(Freshness::UpToDate) = batch.get_freshness(&key)? {
        return batch
            .get_value(&key)?
            .ok_or_else(|| Error::MissingValue(key.clone()));
    }

    // 3. Recurse into inputs, collecting (value, counter) pairs. The
    // counter is read *after* the recursive pull so it reflects the
    // post-recursion state.
    let mut input_values = Vec::with_capacity(node.inputs.len());
    let mut input_counters = Vec::with_capacity(node.inputs.len());
    let mut input_keys = Vec::with_capacity(node.inputs.len());
    for input_key in &node.inputs {
        let value = pull(schema, batch, cache, &input_key.head, &input_key.args)?;
        let encoded = input_key.encode();
        let counter = batch.get_counter(&encoded)?.unwrap_or(0);
        input_values.push(value);
        input_counters.push(counter);
        input_keys.push(encoded);
    }

    let previous_value = batch.get_value(&key)?;
    let previous_record = batch.get_inputs_record(&key)?;

    // 4. Counter-skip.
    if !node.inputs.is_empty() {
        if let (Some(prev_value), Some(prev_record)) = (&previous_value, &previous_record) {
            let same_inputs = prev_record.inputs == input_keys;
            let same_counters = prev_record.input_counters == input_counters;
            if same_inputs && same_counters {
                batch.put_freshness(&key, Freshness::UpToDate)?;
                batch.put_inputs_record(
                    &key,
                    &InputsRecord {
                        inputs: input_keys.clone(),
                        input_counters: input_counters.clone(),
                    },
                )?;
                for input_key in &input_keys {
                    batch.index_revdep(input_key, &key)?;
                }
                return Ok(prev_value.clone());
            }
        }
    }

    // 5. Compute.
    let compiled = schema
        .get(&node.key.head)
        .expect("materialize already validated the head exists");
    let arm = &compiled.arms[node.arm_index];
    let bindings = output_bindings(&arm.var_positions, &node.key.args);

    let output = arm.computor.compute(&input_values, previous_value.as_ref(), &bindings);

    let result = match output {
        ComputorOutput::Unchanged => {
            let prev = previous_value.ok_or_else(|| Error::InvalidUnchanged(key.clone()))?;
            batch.put_inputs_record(
                &key,
                &InputsRecord {
                    inputs: input_keys.clone(),
                    input_counters,
                },
            )?;
            batch.put_freshness(&key, Freshness::UpToDate)?;
            prev
        }
        ComputorOutput::Value(value) => {
            if value.is_null() {
                return Err(Error::InvalidComputorReturnValue(key.clone()));
            }
            let next_counter = batch.get_counter(&key)?.map(|c| c + 1).unwrap_or(1);
            batch.put_counter(&key, next_counter)?;
            batch.put_value(&key, &value)?;
            batch.put_inputs_record(
                &key,
                &InputsRecord {
                    inputs: input_keys.clone(),
                    input_counters,
                },
            )?;
            batch.put_freshness(&key, Freshness::UpToDate)?;
            value
        }
    };

    for input_key in &input_keys {
        batch.index_revdep(input_key, &key)?;
    }

    Ok(result)
}

fn output_bindings(var_positions: &HashMap<String, usize>, args: &[Json]) -> Bindings {
    var_positions
        .iter()
        .map(|(name, &pos)| (name.clone(), args[pos].clone()))
        .collect()
}

/// Decode a node key and read its currently stored value directly,
/// bypassing `pull` — used by debug accessors, never by the recursive
/// evaluation path.
pub fn stored_value(batch: &BatchBuilder<'_>, key: &NodeKey) -> Result<Option<Json>> {
    batch.get_value(&key.encode())
}
