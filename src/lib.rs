//! # Increment — a persistent, demand-driven incremental computation engine
//!
//! A dependency graph that memoizes computed values and invalidates them
//! transitively when inputs change, built around six cooperating
//! components:
//!
//! - `expr`: a pattern-expression parser/canonicalizer (`head(x,y)` syntax)
//! - `schema`: a compiler that validates patterns for overlap, cycles, and
//!   arity conflicts before producing a compiled schema
//! - `node_key`: the canonical `{"head":...,"args":[...]}` key codec
//! - `storage`: five typed `sled`-backed sublevels per schema hash, with a
//!   transactional batch builder
//! - `cache`: a bounded LRU of materialized concrete nodes
//! - `engine`: the mutex-serialized `pull`/`invalidate` evaluation engine
//!
//! ## Architecture
//!
//! Callers submit [`NodeDef`]s at construction; the compiler produces a
//! schema namespaced by a stable hash. At runtime, [`Engine::pull`]
//! descends through a node's declared inputs, reusing cached values when
//! their version counters are unchanged and otherwise invoking the user's
//! computor; [`Engine::invalidate`] marks a node and everything
//! transitively depending on it as needing re-examination on its next
//! pull.

#![warn(missing_docs)]

// Pattern expression parser/canonicalizer.
pub mod expr;

// Node-key codec.
pub mod node_key;

// Schema compiler and validator.
pub mod schema;

// Persistent storage layer: typed sublevels and the batch builder.
pub mod storage;

// Concrete-node LRU cache.
pub mod cache;

// Computor values and the `Unchanged` sentinel.
pub mod value;

// Error taxonomy.
pub mod error;

// Evaluation/invalidation engine and its mutex layer.
mod engine;

pub use engine::{Engine, EngineConfig};
pub use error::{Error, Result};
pub use node_key::NodeKey;
pub use schema::NodeDef;

/// Re-export version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
