//! Canonicalization and unification over pattern expressions.
//!
//! [`canonicalize_mapping`] produces a representation of an
//! `inputs -> output` mapping that is invariant under consistent variable
//! renaming (used for schema hashing, so two schemas that differ only in
//! variable spelling hash identically). [`patterns_overlap`] answers
//! whether two output patterns can unify after alpha-renaming, which is
//! exactly the non-overlap check the schema compiler runs over every pair
//! of output patterns.

use super::ast::{Arg, Expr};
use serde_json::Value as Json;
use std::collections::HashMap;

/// A variable or constant with all variable names replaced by their
/// first-occurrence position, so renaming `u` to `x` everywhere produces
/// an identical [`CanonicalArg`] sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalArg {
    /// Position of this variable's first occurrence across output + inputs.
    Var(usize),
    /// Canonical (deterministic) JSON text of a constant.
    Const(String),
}

/// A single expression with variables replaced by canonical positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalExpr {
    /// Head symbol, unchanged by canonicalization.
    pub head: String,
    /// Canonicalized argument list.
    pub args: Vec<CanonicalArg>,
}

/// A full `inputs -> output` mapping in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalMapping {
    /// Canonicalized output expression.
    pub output: CanonicalExpr,
    /// Canonicalized input expressions, in declaration order.
    pub inputs: Vec<CanonicalExpr>,
}

impl CanonicalMapping {
    /// Deterministic text form, suitable as input to a stable hash.
    pub fn canonical_text(&self) -> String {
        let mut out = String::new();
        render_canonical_expr(&self.output, &mut out);
        out.push_str("=>");
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            render_canonical_expr(input, &mut out);
        }
        out
    }
}

fn render_canonical_expr(expr: &CanonicalExpr, out: &mut String) {
    out.push_str(&expr.head);
    out.push('(');
    for (i, arg) in expr.args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match arg {
            CanonicalArg::Var(pos) => out.push_str(&format!("${}", pos)),
            CanonicalArg::Const(text) => out.push_str(text),
        }
    }
    out.push(')');
}

/// Canonicalize an `inputs -> output` mapping for hashing/comparison.
pub fn canonicalize_mapping(output: &Expr, inputs: &[Expr]) -> CanonicalMapping {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut next = 0usize;
    let mut assign = |name: &str| -> usize {
        if let Some(&pos) = positions.get(name) {
            pos
        } else {
            let pos = next;
            positions.insert(name, pos);
            next += 1;
            pos
        }
    };

    let canon_expr = |expr: &Expr, assign: &mut dyn FnMut(&str) -> usize| -> CanonicalExpr {
        let args = expr
            .args()
            .iter()
            .map(|a| match a {
                Arg::Var(name) => CanonicalArg::Var(assign(name)),
                Arg::Const(value) => CanonicalArg::Const(canonical_json_text(value)),
            })
            .collect();
        CanonicalExpr {
            head: expr.head().to_string(),
            args,
        }
    };

    let output_canon = canon_expr(output, &mut assign);
    let input_canons = inputs.iter().map(|e| canon_expr(e, &mut assign)).collect();

    CanonicalMapping {
        output: output_canon,
        inputs: input_canons,
    }
}

fn canonical_json_text(value: &Json) -> String {
    // Inputs to the parser are only Null/Bool/Number/String, all of which
    // serialize deterministically without key-ordering concerns.
    serde_json::to_string(value).unwrap_or_default()
}

/// A reference to a variable in one of the two patterns being unified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VarRef {
    Left(String),
    Right(String),
}

#[derive(Debug, Clone)]
enum Binding {
    Const(Json),
    Var(VarRef),
}

struct Unifier {
    bindings: HashMap<VarRef, Binding>,
}

impl Unifier {
    fn new() -> Self {
        Unifier {
            bindings: HashMap::new(),
        }
    }

    fn resolve(&self, mut v: VarRef) -> Binding {
        // Chains are at most `bindings.len()` long since each `insert` only
        // ever points at a key already present when the union happens.
        for _ in 0..=self.bindings.len() {
            match self.bindings.get(&v) {
                Some(Binding::Var(next)) => v = next.clone(),
                Some(other) => return other.clone(),
                None => return Binding::Var(v),
            }
        }
        Binding::Var(v)
    }

    fn unify_arg(&mut self, left: &Arg, right: &Arg) -> bool {
        let lt = match left {
            Arg::Var(name) => self.resolve(VarRef::Left(name.clone())),
            Arg::Const(value) => Binding::Const(value.clone()),
        };
        let rt = match right {
            Arg::Var(name) => self.resolve(VarRef::Right(name.clone())),
            Arg::Const(value) => Binding::Const(value.clone()),
        };
        match (lt, rt) {
            (Binding::Const(a), Binding::Const(b)) => a == b,
            (Binding::Const(a), Binding::Var(v)) | (Binding::Var(v), Binding::Const(a)) => {
                self.bindings.insert(v, Binding::Const(a));
                true
            }
            (Binding::Var(v1), Binding::Var(v2)) => {
                if v1 != v2 {
                    self.bindings.insert(v1, Binding::Var(v2));
                }
                true
            }
        }
    }
}

/// `true` if `a` and `b` can unify under some substitution after treating
/// their variables as belonging to disjoint namespaces (i.e. alpha-renamed
/// apart). Expressions with different heads or arities never overlap.
pub fn patterns_overlap(a: &Expr, b: &Expr) -> bool {
    if a.head() != b.head() || a.arity() != b.arity() {
        return false;
    }
    let mut u = Unifier::new();
    a.args().iter().zip(b.args().iter()).all(|(x, y)| u.unify_arg(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse_expr;

    #[test]
    fn canonicalization_is_invariant_under_renaming() {
        let a_out = parse_expr("paired(i)").unwrap();
        let a_in = vec![parse_expr("item(i)").unwrap()];
        let b_out = parse_expr("paired(j)").unwrap();
        let b_in = vec![parse_expr("item(j)").unwrap()];

        let ca = canonicalize_mapping(&a_out, &a_in);
        let cb = canonicalize_mapping(&b_out, &b_in);
        assert_eq!(ca, cb);
        assert_eq!(ca.canonical_text(), cb.canonical_text());
    }

    #[test]
    fn canonicalization_distinguishes_different_structure() {
        let out1 = parse_expr("pair(i,j)").unwrap();
        let out2 = parse_expr("pair(i,i)").unwrap();
        let c1 = canonicalize_mapping(&out1, &[]);
        let c2 = canonicalize_mapping(&out2, &[]);
        assert_ne!(c1, c2);
    }

    #[test]
    fn two_fully_variable_patterns_with_same_head_overlap() {
        let a = parse_expr("user(u)").unwrap();
        let b = parse_expr("user(v)").unwrap();
        assert!(patterns_overlap(&a, &b));
    }

    #[test]
    fn disjoint_constants_do_not_overlap() {
        let a = parse_expr("item(\"x\")").unwrap();
        let b = parse_expr("item(\"y\")").unwrap();
        assert!(!patterns_overlap(&a, &b));
    }

    #[test]
    fn constant_and_variable_overlap() {
        let a = parse_expr("item(\"x\")").unwrap();
        let b = parse_expr("item(v)").unwrap();
        assert!(patterns_overlap(&a, &b));
    }

    #[test]
    fn different_heads_never_overlap() {
        let a = parse_expr("user(u)").unwrap();
        let b = parse_expr("posts(u)").unwrap();
        assert!(!patterns_overlap(&a, &b));
    }

    #[test]
    fn different_arity_never_overlap() {
        let a = parse_expr("user(u)").unwrap();
        let b = parse_expr("user(u,v)").unwrap();
        assert!(!patterns_overlap(&a, &b));
    }
}
