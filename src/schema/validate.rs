//! # Schema Compiler & Validator
//!
//! Takes a list of [`NodeDef`]s and produces a validated [`Schema`].
//! Validations run in the order documented in the module-level design:
//! parse, no-overlap, acyclic, single-arity-per-head, input-arity-match.
//! Each failure is fatal — the schema (and therefore the engine) is never
//! constructed.

use super::def::{Arm, CompiledNode, NodeDef, Schema};
use super::hash::schema_hash;
use crate::error::{Error, Result};
use crate::expr::{canonicalize_mapping, parse_expr, patterns_overlap};
use std::collections::{HashMap, HashSet};

/// Compile and validate a list of node definitions into a [`Schema`].
pub fn compile(defs: Vec<NodeDef>) -> Result<Schema> {
    // 1. Parse every pattern up front; a single bad pattern fails the
    // whole construction.
    let mut parsed = Vec::with_capacity(defs.len());
    for def in defs {
        let output = parse_expr(&def.output)?;
        let inputs = def
            .inputs
            .iter()
            .map(|s| parse_expr(s))
            .collect::<Result<Vec<_>>>()?;
        parsed.push((output, inputs, def.computor));
    }

    // 2. No overlap between any pair of output patterns.
    for i in 0..parsed.len() {
        for j in (i + 1)..parsed.len() {
            if patterns_overlap(&parsed[i].0, &parsed[j].0) {
                return Err(Error::SchemaOverlap(
                    crate::expr::render_expr(&parsed[i].0),
                    crate::expr::render_expr(&parsed[j].0),
                ));
            }
        }
    }

    // 3. Acyclic output-head -> input-head graph.
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for (output, inputs, _) in &parsed {
        let entry = edges.entry(output.head()).or_default();
        for input in inputs {
            entry.push(input.head());
        }
    }
    detect_cycle(&edges)?;

    // 4. Single arity per head.
    let mut arity_by_head: HashMap<String, usize> = HashMap::new();
    for (output, _, _) in &parsed {
        let head = output.head().to_string();
        let arity = output.arity();
        match arity_by_head.get(&head) {
            Some(&existing) if existing != arity => {
                return Err(Error::SchemaArityConflict {
                    head,
                    first: existing,
                    second: arity,
                });
            }
            _ => {
                arity_by_head.insert(head, arity);
            }
        }
    }

    // 5. Every input's arity matches the declared output arity of the head
    // it references.
    for (output, inputs, _) in &parsed {
        for input in inputs {
            if let Some(&expected) = arity_by_head.get(input.head()) {
                if expected != input.arity() {
                    return Err(Error::ArityMismatch {
                        head: input.head().to_string(),
                        expected,
                        actual: input.arity(),
                    });
                }
            } else {
                return Err(Error::InvalidSchema(format!(
                    "node '{}' references undefined head '{}' in an input expression",
                    output.head(),
                    input.head()
                )));
            }
        }
    }

    // Build compiled nodes, grouped by head, and the canonical mappings
    // used for schema hashing.
    let mut nodes: HashMap<String, CompiledNode> = HashMap::new();
    let mut mappings = Vec::with_capacity(parsed.len());

    for (output, inputs, computor) in parsed {
        mappings.push(canonicalize_mapping(&output, &inputs));

        let var_positions = output
            .variables()
            .into_iter()
            .enumerate()
            .map(|(pos, name)| (name.to_string(), pos))
            .collect::<HashMap<_, _>>();

        let head = output.head().to_string();
        let arity = output.arity();
        let is_pattern_arm = output.is_pattern();

        let arm = Arm {
            output,
            inputs,
            var_positions,
            computor,
        };

        nodes
            .entry(head.clone())
            .and_modify(|node| {
                node.is_pattern = node.is_pattern || is_pattern_arm;
            })
            .or_insert_with(|| CompiledNode {
                head: head.clone(),
                arity,
                is_pattern: is_pattern_arm,
                arms: Vec::new(),
            })
            .arms
            .push(arm);
    }

    let hash = schema_hash(&mappings);

    Ok(Schema { nodes, hash })
}

/// DFS-based cycle detection over the output-head -> input-head graph.
/// Returns the cycle as a head-symbol path (closing back on the repeated
/// head) on failure.
fn detect_cycle(edges: &HashMap<&str, Vec<&str>>) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();

    fn visit<'a>(
        node: &'a str,
        edges: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Result<()> {
        if let Some(Mark::Done) = marks.get(node) {
            return Ok(());
        }
        if let Some(Mark::Visiting) = marks.get(node) {
            let start = stack.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(node.to_string());
            return Err(Error::SchemaCycle(cycle));
        }
        marks.insert(node, Mark::Visiting);
        stack.push(node);
        if let Some(deps) = edges.get(node) {
            let mut seen_here: HashSet<&str> = HashSet::new();
            for dep in deps {
                if seen_here.insert(dep) {
                    visit(dep, edges, marks, stack)?;
                }
            }
        }
        stack.pop();
        marks.insert(node, Mark::Done);
        Ok(())
    }

    for head in edges.keys() {
        visit(head, edges, &mut marks, &mut stack)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ComputorOutput;
    use serde_json::json;

    fn noop_computor() -> crate::value::BoxedComputor {
        Box::new(|_: &[serde_json::Value], _: Option<&serde_json::Value>, _: &crate::value::Bindings| {
            ComputorOutput::Value(json!(null))
        })
    }

    #[test]
    fn rejects_direct_cycle() {
        let defs = vec![
            NodeDef::new("a", vec!["b".to_string()], noop_computor()),
            NodeDef::new("b", vec!["a".to_string()], noop_computor()),
        ];
        let err = compile(defs).unwrap_err();
        assert!(matches!(err, Error::SchemaCycle(_)));
    }

    #[test]
    fn rejects_self_cycle() {
        let defs = vec![NodeDef::new("a", vec!["a".to_string()], noop_computor())];
        let err = compile(defs).unwrap_err();
        assert!(matches!(err, Error::SchemaCycle(_)));
    }

    #[test]
    fn accepts_acyclic_chain() {
        let defs = vec![
            NodeDef::new("a", vec![], noop_computor()),
            NodeDef::new("b", vec!["a".to_string()], noop_computor()),
            NodeDef::new("c", vec!["b".to_string()], noop_computor()),
        ];
        assert!(compile(defs).is_ok());
    }

    #[test]
    fn rejects_overlapping_outputs() {
        let defs = vec![
            NodeDef::new("config(x)", vec![], noop_computor()),
            NodeDef::new("config(y)", vec![], noop_computor()),
        ];
        let err = compile(defs).unwrap_err();
        assert!(matches!(err, Error::SchemaOverlap(_, _)));
    }

    #[test]
    fn accepts_non_overlapping_const_arms() {
        let defs = vec![
            NodeDef::new("config(\"a\")", vec![], noop_computor()),
            NodeDef::new("config(\"b\")", vec![], noop_computor()),
        ];
        assert!(compile(defs).is_ok());
    }

    #[test]
    fn rejects_arity_conflict() {
        let defs = vec![
            NodeDef::new("thing(x)", vec![], noop_computor()),
            NodeDef::new("thing(x,y)", vec![], noop_computor()),
        ];
        let err = compile(defs).unwrap_err();
        assert!(matches!(err, Error::SchemaArityConflict { .. }));
    }

    #[test]
    fn rejects_input_arity_mismatch() {
        let defs = vec![
            NodeDef::new("item(i)", vec![], noop_computor()),
            NodeDef::new("paired(i)", vec!["item(i,i)".to_string()], noop_computor()),
        ];
        let err = compile(defs).unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { .. }));
    }

    #[test]
    fn rejects_reference_to_undefined_head() {
        let defs = vec![NodeDef::new("b(x)", vec!["a(x)".to_string()], noop_computor())];
        let err = compile(defs).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }
}
