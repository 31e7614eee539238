//! Error taxonomy for the incremental computation engine.
//!
//! Every fallible operation in this crate — schema compilation, expression
//! parsing, node materialization, `pull`, `invalidate`, and the storage
//! layer underneath them — returns a variant of [`Error`]. The policy for
//! each kind (surface to the caller, fail construction, abort the current
//! batch) is documented on the variant itself.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The complete set of failure modes the engine can produce.
#[derive(Error, Debug)]
pub enum Error {
    /// `pull`/`invalidate` referenced a head that is not in the compiled schema.
    #[error("invalid node: head '{0}' is not defined in the schema")]
    InvalidNode(String),

    /// Argument count did not match the compiled head's arity.
    #[error("arity mismatch for '{head}': expected {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// Head symbol the call targeted.
        head: String,
        /// Arity recorded in the compiled schema.
        expected: usize,
        /// Number of arguments actually supplied.
        actual: usize,
    },

    /// The caller passed a pattern (containing free variables) to a runtime API
    /// that only accepts concrete, ground argument lists.
    #[error("schema pattern not allowed: '{0}' still contains free variables")]
    SchemaPatternNotAllowed(String),

    /// Generic schema-construction failure, used when no more specific
    /// variant applies.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Two output patterns unify under some substitution.
    #[error("schema overlap between '{0}' and '{1}'")]
    SchemaOverlap(String, String),

    /// The output-head -> input-head graph contains a cycle.
    #[error("schema cycle detected: {}", .0.join(" -> "))]
    SchemaCycle(Vec<String>),

    /// A head symbol was declared with more than one arity.
    #[error("head '{head}' declared with conflicting arities: {first} and {second}")]
    SchemaArityConflict {
        /// The conflicting head symbol.
        head: String,
        /// First arity observed.
        first: usize,
        /// Second, conflicting arity observed.
        second: usize,
    },

    /// A pattern expression string failed to parse.
    #[error("invalid expression '{expr}': {reason}")]
    InvalidExpression {
        /// The offending source text.
        expr: String,
        /// Human-readable reason the parse failed.
        reason: String,
    },

    /// A node marked `up-to-date` has no stored value. This indicates
    /// storage corruption; it is never expected in correct operation.
    #[error("missing value for node marked up-to-date: {0}")]
    MissingValue(String),

    /// A computor returned `null`/`undefined` in place of a value.
    #[error("invalid computor return value for node {0}: computors must return a value or Unchanged")]
    InvalidComputorReturnValue(String),

    /// A computor returned `Unchanged` for a node with no prior stored value.
    #[error("invalid Unchanged for node {0}: no prior value exists to reuse")]
    InvalidUnchanged(String),

    /// The underlying key-value store failed.
    #[error("storage error during {operation} on key '{key}': {source}")]
    StorageError {
        /// The storage operation being attempted (`get`, `put`, `del`, batch commit, ...).
        operation: &'static str,
        /// The key involved, or an empty string for whole-batch failures.
        key: String,
        /// The underlying sled error.
        #[source]
        source: sled::Error,
    },

    /// A stored JSON blob failed to decode back into its expected shape.
    /// This is a storage-corruption case, in the same spirit as
    /// [`Error::MissingValue`]: it should never happen if only this crate
    /// ever wrote the sublevel in question.
    #[error("corrupt stored data for key '{key}' during {operation}: {reason}")]
    CorruptData {
        /// The storage operation in progress when decoding failed.
        operation: &'static str,
        /// The key whose stored value could not be decoded.
        key: String,
        /// The underlying JSON error message.
        reason: String,
    },
}

impl Error {
    pub(crate) fn storage(operation: &'static str, key: impl Into<String>, source: sled::Error) -> Self {
        Error::StorageError {
            operation,
            key: key.into(),
            source,
        }
    }

    pub(crate) fn corrupt(operation: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptData {
            operation,
            key: key.into(),
            reason: reason.into(),
        }
    }
}
