//! Compiled schema types.
//!
//! A [`NodeDef`] is what a caller supplies at construction: an output
//! pattern, zero or more input patterns over the same variable space, and
//! a computor. [`compile`](super::validate::compile) turns a list of these
//! into a [`Schema`]: one [`CompiledNode`] per head, each holding one or
//! more non-overlapping [`Arm`]s.

use crate::expr::Expr;
use crate::value::BoxedComputor;
use std::collections::HashMap;

/// A user-supplied node definition, as passed to [`crate::Engine::open`].
pub struct NodeDef {
    /// Output pattern text, e.g. `"user(u)"`.
    pub output: String,
    /// Input pattern texts, over the same variable space as `output`.
    pub inputs: Vec<String>,
    /// The computor that produces this node's value.
    pub computor: BoxedComputor,
}

impl NodeDef {
    /// Construct a node definition.
    pub fn new(output: impl Into<String>, inputs: Vec<String>, computor: BoxedComputor) -> Self {
        NodeDef {
            output: output.into(),
            inputs,
            computor,
        }
    }
}

/// One compiled `output -> inputs` mapping, plus its computor and the
/// output pattern's variable-name -> positional-argument map.
pub struct Arm {
    /// The parsed output pattern.
    pub output: Expr,
    /// The parsed input expressions, in declaration order.
    pub inputs: Vec<Expr>,
    /// Variable name -> position in the output's argument list.
    pub var_positions: HashMap<String, usize>,
    /// The computor for this arm.
    pub computor: BoxedComputor,
}

/// All arms sharing one head symbol. Per the schema's single-arity
/// invariant, every arm under one `CompiledNode` has the same arity.
pub struct CompiledNode {
    /// The head symbol.
    pub head: String,
    /// The arity shared by every arm.
    pub arity: usize,
    /// Whether any arm's output pattern contains a free variable (almost
    /// always true — a `CompiledNode` with zero variable positions across
    /// every arm is a fully-ground singleton node).
    pub is_pattern: bool,
    /// The compiled arms, in declaration order. Validated pairwise
    /// non-overlapping at construction time.
    pub arms: Vec<Arm>,
}

impl CompiledNode {
    /// Find the index of the arm whose output pattern matches `args`: every
    /// constant position in the arm's output must equal the corresponding
    /// argument. Non-overlap is validated at schema-compile time, so at
    /// most one arm ever matches.
    pub fn matching_arm_index(&self, args: &[serde_json::Value]) -> Option<usize> {
        self.arms.iter().position(|arm| arm_matches(arm, args))
    }
}

fn arm_matches(arm: &Arm, args: &[serde_json::Value]) -> bool {
    use crate::expr::Arg;
    if arm.output.arity() != args.len() {
        return false;
    }
    arm.output
        .args()
        .iter()
        .zip(args.iter())
        .all(|(pattern_arg, concrete)| match pattern_arg {
            Arg::Var(_) => true,
            Arg::Const(value) => value == concrete,
        })
}

/// A compiled, validated schema: one [`CompiledNode`] per head, plus the
/// stable hash namespacing all persistent state for this schema.
pub struct Schema {
    pub(crate) nodes: HashMap<String, CompiledNode>,
    pub(crate) hash: String,
}

impl Schema {
    /// Look up the compiled node for a head symbol.
    pub fn get(&self, head: &str) -> Option<&CompiledNode> {
        self.nodes.get(head)
    }

    /// The stable schema hash namespacing this schema's persistent state.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Iterate over all compiled heads.
    pub fn heads(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }
}
