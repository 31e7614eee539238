//! Abstract syntax for pattern expressions (`head(x,y)`, `user(u)`, `now`).

use serde_json::Value as Json;

/// A parsed pattern expression.
///
/// `Sym` is the zero-argument form (`now`, `root`); `Call` carries a head
/// symbol and its positional argument list. Semantically `Sym("now")` and
/// `Call("now", vec![])` describe the same arity-0 node — the engine
/// normalizes between them via [`Expr::arity`] and [`Expr::head`] rather
/// than by rewriting one into the other, so that [`crate::expr::render`]
/// can round-trip whichever form the user actually wrote.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A bare head symbol with no argument list, e.g. `now`.
    Sym(String),
    /// A head applied to a positional argument list, e.g. `user(u)`.
    Call(String, Vec<Arg>),
}

/// A single positional argument inside a [`Expr::Call`].
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A variable reference, bound positionally from the enclosing pattern.
    Var(String),
    /// A ground (ready-to-use) constant value.
    Const(Json),
}

impl Expr {
    /// The head symbol, regardless of arity.
    pub fn head(&self) -> &str {
        match self {
            Expr::Sym(name) => name,
            Expr::Call(name, _) => name,
        }
    }

    /// Number of positional arguments.
    pub fn arity(&self) -> usize {
        match self {
            Expr::Sym(_) => 0,
            Expr::Call(_, args) => args.len(),
        }
    }

    /// The argument list, empty for [`Expr::Sym`].
    pub fn args(&self) -> &[Arg] {
        match self {
            Expr::Sym(_) => &[],
            Expr::Call(_, args) => args,
        }
    }

    /// `true` if any argument is a variable (i.e. this expression is a
    /// pattern rather than a fully ground node reference).
    pub fn is_pattern(&self) -> bool {
        self.args().iter().any(|a| matches!(a, Arg::Var(_)))
    }

    /// Ordered list of distinct variable names appearing in this expression,
    /// in first-occurrence order.
    pub fn variables(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for arg in self.args() {
            if let Arg::Var(name) = arg {
                if !seen.contains(&name.as_str()) {
                    seen.push(name.as_str());
                }
            }
        }
        seen
    }
}
