//! # Concrete-Node Cache
//!
//! A bounded LRU, keyed by the canonical node-key string, of materialized
//! [`ConcreteNode`]s. A cache miss is rebuilt from the schema and the
//! node's positional bindings; persistent state, not this cache, is
//! always the source of truth, so an eviction never loses information —
//! it only costs a re-materialization on the next reference.

use crate::node_key::NodeKey;
use lru::LruCache;
use std::num::NonZeroUsize;

/// A pattern instantiated with ground arguments: which schema arm produced
/// it, and the concrete keys of its declared inputs (already substituted
/// through the arm's variable-position map).
#[derive(Debug, Clone)]
pub struct ConcreteNode {
    /// This node's own canonical key.
    pub key: NodeKey,
    /// Index of the matching arm within `schema.get(head).arms`.
    pub arm_index: usize,
    /// Concrete keys of this node's declared inputs, in declaration order.
    pub inputs: Vec<NodeKey>,
}

/// Bounded LRU of [`ConcreteNode`]s, keyed by canonical node-key string.
pub struct ConcreteNodeCache {
    inner: LruCache<String, ConcreteNode>,
}

impl ConcreteNodeCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        ConcreteNodeCache {
            inner: LruCache::new(capacity),
        }
    }

    /// Fetch a cached node, marking it most-recently-used.
    pub fn get(&mut self, key: &str) -> Option<&ConcreteNode> {
        self.inner.get(key)
    }

    /// Insert (or refresh) a materialized node.
    pub fn put(&mut self, key: String, node: ConcreteNode) {
        self.inner.put(key, node);
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = ConcreteNodeCache::new(2);
        let mk = |h: &str| ConcreteNode {
            key: NodeKey::new(h, vec![json!(1)]),
            arm_index: 0,
            inputs: vec![],
        };
        cache.put("a".to_string(), mk("a"));
        cache.put("b".to_string(), mk("b"));
        // Touch "a" so "b" becomes the least recently used entry.
        cache.get("a");
        cache.put("c".to_string(), mk("c"));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }
}
