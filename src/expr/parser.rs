//! Recursive-descent parser for pattern expressions.
//!
//! Grammar:
//!
//! ```text
//! expr    := ident ( '(' arglist? ')' )?
//! arglist := arg ( ',' arg )*
//! arg     := ident | json-literal
//! ident   := [A-Za-z_][A-Za-z0-9_]*
//! ```
//!
//! An `ident` argument is a [`crate::expr::ast::Arg::Var`]; any other
//! literal (string, number, `true`/`false`/`null`) is a
//! [`crate::expr::ast::Arg::Const`].

use super::ast::{Arg, Expr};
use crate::error::{Error, Result};
use serde_json::Value as Json;

/// Parse a pattern expression, e.g. `"user(u)"` or `"now"`.
pub fn parse_expr(input: &str) -> Result<Expr> {
    let mut p = Parser::new(input);
    let expr = p.parse_expr()?;
    p.skip_ws();
    if !p.at_end() {
        return Err(invalid(input, format!("unexpected trailing input at byte {}", p.pos)));
    }
    Ok(expr)
}

fn invalid(input: &str, reason: impl Into<String>) -> Error {
    Error::InvalidExpression {
        expr: input.to_string(),
        reason: reason.into(),
    }
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(invalid(
                self.src,
                format!("expected '{}' at byte {}", c as char, self.pos),
            ))
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.pos += 1,
            _ => return Err(invalid(self.src, format!("expected identifier at byte {}", self.pos))),
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let head = self.parse_ident()?;
        self.skip_ws();
        if self.peek() == Some(b'(') {
            self.pos += 1;
            let args = self.parse_arglist()?;
            self.expect(b')')?;
            Ok(Expr::Call(head, args))
        } else {
            Ok(Expr::Sym(head))
        }
    }

    fn parse_arglist(&mut self) -> Result<Vec<Arg>> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b')') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_arg()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                _ => break,
            }
        }
        Ok(args)
    }

    fn parse_arg(&mut self) -> Result<Arg> {
        self.skip_ws();
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                let ident = self.parse_ident()?;
                Ok(match ident.as_str() {
                    "true" => Arg::Const(Json::Bool(true)),
                    "false" => Arg::Const(Json::Bool(false)),
                    "null" => Arg::Const(Json::Null),
                    _ => Arg::Var(ident),
                })
            }
            Some(b'"') => self.parse_string().map(Arg::Const),
            Some(b) if b.is_ascii_digit() || b == b'-' => self.parse_number().map(Arg::Const),
            _ => Err(invalid(self.src, format!("unexpected character at byte {}", self.pos))),
        }
    }

    fn parse_string(&mut self) -> Result<Json> {
        // Leading quote already confirmed by caller.
        self.pos += 1;
        let start = self.pos;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(invalid(self.src, "unterminated string literal")),
                Some(b'"') => {
                    out.push_str(&self.src[start..self.pos]);
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    out.push_str(&self.src[start..self.pos]);
                    self.pos += 1;
                    match self.peek() {
                        Some(b'n') => out.push('\n'),
                        Some(b't') => out.push('\t'),
                        Some(b'"') => out.push('"'),
                        Some(b'\\') => out.push('\\'),
                        _ => return Err(invalid(self.src, "invalid escape sequence")),
                    }
                    self.pos += 1;
                    // restart the unescaped-run tracker at the new position.
                    return self.finish_string(out);
                }
                Some(_) => self.pos += 1,
            }
        }
        Ok(Json::String(out))
    }

    /// Continues scanning a string literal after an escape sequence has
    /// already been appended to `out`.
    fn finish_string(&mut self, mut out: String) -> Result<Json> {
        let mut start = self.pos;
        loop {
            match self.peek() {
                None => return Err(invalid(self.src, "unterminated string literal")),
                Some(b'"') => {
                    out.push_str(&self.src[start..self.pos]);
                    self.pos += 1;
                    return Ok(Json::String(out));
                }
                Some(b'\\') => {
                    out.push_str(&self.src[start..self.pos]);
                    self.pos += 1;
                    match self.peek() {
                        Some(b'n') => out.push('\n'),
                        Some(b't') => out.push('\t'),
                        Some(b'"') => out.push('"'),
                        Some(b'\\') => out.push('\\'),
                        _ => return Err(invalid(self.src, "invalid escape sequence")),
                    }
                    self.pos += 1;
                    start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn parse_number(&mut self) -> Result<Json> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || b == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.src[start..self.pos];
        text.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Json::Number)
            .ok_or_else(|| invalid(self.src, format!("invalid number literal '{}'", text)))
    }
}
