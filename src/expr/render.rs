//! Renders a parsed [`Expr`] back to its canonical textual form.
//!
//! `parse_expr(render_expr(ast))` must yield an AST equal to `ast` for any
//! `ast` produced by [`super::parser::parse_expr`] — this is exercised
//! directly in the unit tests below.

use super::ast::{Arg, Expr};
use serde_json::Value as Json;

/// Render an expression back to pattern syntax.
pub fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Sym(name) => name.clone(),
        Expr::Call(head, args) => {
            let rendered_args: Vec<String> = args.iter().map(render_arg).collect();
            format!("{}({})", head, rendered_args.join(","))
        }
    }
}

fn render_arg(arg: &Arg) -> String {
    match arg {
        Arg::Var(name) => name.clone(),
        Arg::Const(value) => render_const(value),
    }
}

fn render_const(value: &Json) -> String {
    match value {
        Json::Null => "null".to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        Json::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse_expr;
    use super::*;

    fn roundtrip(src: &str) {
        let ast = parse_expr(src).unwrap();
        let rendered = render_expr(&ast);
        let reparsed = parse_expr(&rendered).unwrap();
        assert_eq!(ast, reparsed, "roundtrip mismatch for {src:?}: rendered as {rendered:?}");
    }

    #[test]
    fn roundtrips_bare_symbol() {
        roundtrip("now");
    }

    #[test]
    fn roundtrips_single_var() {
        roundtrip("user(u)");
    }

    #[test]
    fn roundtrips_multi_var() {
        roundtrip("posts(u,p)");
    }

    #[test]
    fn roundtrips_const_args() {
        roundtrip("item(\"x\")");
        roundtrip("coord(1,2)");
        roundtrip("flag(true,false,null)");
    }

    #[test]
    fn roundtrips_mixed_var_and_const() {
        roundtrip("paired(i,\"fixed\")");
    }
}
