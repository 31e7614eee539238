//! # Node-Key Codec
//!
//! Bidirectional conversion between a concrete `(head, args)` node and the
//! canonical string used as its persistent key:
//! `{"head":"<head>","args":[...]}`, field order fixed, no whitespace.
//! Encoding is deterministic for equal tuples; decoding a string this
//! codec did not produce fails deterministically rather than silently
//! accepting a different shape.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

/// A concrete node identity: a head symbol plus an ordered list of ground
/// argument values. Equality is structural and argument order matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    /// The functor name.
    pub head: String,
    /// Ordered, ground (JSON-serializable) argument values.
    pub args: Vec<Json>,
}

impl NodeKey {
    /// Construct a node key from a head and argument list.
    pub fn new(head: impl Into<String>, args: Vec<Json>) -> Self {
        NodeKey {
            head: head.into(),
            args,
        }
    }

    /// Encode to the canonical string form. Field order and absence of
    /// whitespace are guaranteed by `serde_json`'s compact struct
    /// serialization plus this struct's declared field order (`head`
    /// before `args`).
    pub fn encode(&self) -> String {
        // `serde_json::to_string` cannot fail for a struct of JSON-safe
        // fields; `NodeKey`'s args are always already-valid `Json`.
        serde_json::to_string(self).expect("NodeKey is always JSON-serializable")
    }

    /// Decode a canonical string back into a node key. Fails
    /// deterministically if `s` was not produced by [`NodeKey::encode`].
    pub fn decode(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::InvalidNode(format!("malformed node key '{s}': {e}")))
    }

    /// Encode as raw bytes, for use directly as a `sled` tree key.
    pub fn encode_bytes(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_canonical_form_with_no_whitespace() {
        let key = NodeKey::new("user", vec![json!("u1")]);
        assert_eq!(key.encode(), r#"{"head":"user","args":["u1"]}"#);
    }

    #[test]
    fn round_trips_through_decode() {
        let key = NodeKey::new("posts", vec![json!("u1"), json!(42)]);
        let encoded = key.encode();
        let decoded = NodeKey::decode(&encoded).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn equal_tuples_encode_identically() {
        let a = NodeKey::new("user", vec![json!("u1")]);
        let b = NodeKey::new("user", vec![json!("u1")]);
        assert_eq!(a.encode(), b.encode());
    }

    #[test]
    fn argument_order_is_significant() {
        let a = NodeKey::new("pair", vec![json!(1), json!(2)]);
        let b = NodeKey::new("pair", vec![json!(2), json!(1)]);
        assert_ne!(a.encode(), b.encode());
        assert_ne!(a, b);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(NodeKey::decode("not json at all").is_err());
        assert!(NodeKey::decode(r#"{"foo":"bar"}"#).is_err());
    }
}
