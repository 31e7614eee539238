//! Concrete-node materialization: the shared first step both `pull` and
//! `invalidate` run before anything else. Looks the node up in the LRU
//! cache; on a miss, instantiates it from the schema by substituting the
//! caller's positional arguments through the matching arm's
//! variable-position map.

use crate::cache::{ConcreteNode, ConcreteNodeCache};
use crate::error::{Error, Result};
use crate::expr::Arg;
use crate::node_key::NodeKey;
use crate::schema::Schema;
use crate::value::Bindings;
use serde_json::Value as Json;

/// Reject a `head` argument that looks like a raw pattern string
/// (containing parentheses) rather than a plain head symbol — callers must
/// pass positional arguments through `args`, not embed them in `head`.
pub fn ensure_plain_head(head: &str) -> Result<()> {
    if head.contains('(') || head.contains(')') {
        return Err(Error::SchemaPatternNotAllowed(head.to_string()));
    }
    Ok(())
}

/// Validate `head`/`args` against the compiled schema and return the
/// matching arm's index, without touching the cache.
pub fn validate_call<'s>(
    schema: &'s Schema,
    head: &str,
    args: &[Json],
) -> Result<(&'s crate::schema::CompiledNode, usize)> {
    ensure_plain_head(head)?;
    let compiled = schema.get(head).ok_or_else(|| Error::InvalidNode(head.to_string()))?;
    if args.len() != compiled.arity {
        return Err(Error::ArityMismatch {
            head: head.to_string(),
            expected: compiled.arity,
            actual: args.len(),
        });
    }
    let arm_index = compiled
        .matching_arm_index(args)
        .ok_or_else(|| Error::InvalidNode(format!("no matching pattern arm for '{head}' with given arguments")))?;
    Ok((compiled, arm_index))
}

/// Build the positional-bindings map for an arm given concrete `args`.
fn bindings_for(var_positions: &std::collections::HashMap<String, usize>, args: &[Json]) -> Bindings {
    var_positions
        .iter()
        .map(|(name, &pos)| (name.clone(), args[pos].clone()))
        .collect()
}

/// Substitute an input expression's variables through `bindings`, yielding
/// its concrete node key.
fn substitute(expr: &crate::expr::Expr, bindings: &Bindings) -> Result<NodeKey> {
    let mut concrete_args = Vec::with_capacity(expr.arity());
    for arg in expr.args() {
        let value = match arg {
            Arg::Var(name) => bindings
                .get(name)
                .cloned()
                .ok_or_else(|| Error::InvalidSchema(format!("input expression references unbound variable '{name}'")))?,
            Arg::Const(value) => value.clone(),
        };
        concrete_args.push(value);
    }
    Ok(NodeKey::new(expr.head(), concrete_args))
}

/// Materialize the concrete node for `(head, args)`, consulting (and
/// populating) the LRU cache.
pub fn materialize(
    schema: &Schema,
    cache: &mut ConcreteNodeCache,
    head: &str,
    args: &[Json],
) -> Result<ConcreteNode> {
    let (compiled, arm_index) = validate_call(schema, head, args)?;

    let key = NodeKey::new(head, args.to_vec());
    let cache_key = key.encode();

    if let Some(node) = cache.get(&cache_key) {
        return Ok(node.clone());
    }

    let arm = &compiled.arms[arm_index];
    let bindings = bindings_for(&arm.var_positions, args);
    let inputs = arm
        .inputs
        .iter()
        .map(|input| substitute(input, &bindings))
        .collect::<Result<Vec<_>>>()?;

    let node = ConcreteNode {
        key,
        arm_index,
        inputs,
    };
    cache.put(cache_key, node.clone());
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_pattern_text_passed_as_head() {
        assert!(ensure_plain_head("user(u)").is_err());
        assert!(ensure_plain_head("user").is_ok());
    }
}
