//! Computor values and the `Unchanged` sentinel.
//!
//! A computor observes the current values of a node's inputs (and, if one
//! exists, the node's previous value) and returns either a brand-new value
//! or [`ComputorOutput::Unchanged`], asserting that the previous value is
//! still semantically current. `null`/`undefined` is never a legal return;
//! the engine turns a `Json::Null` [`ComputorOutput::Value`] into
//! [`crate::error::Error::InvalidComputorReturnValue`].

use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;

/// Positional variable bindings observed for one concrete node
/// instantiation, keyed by the variable name as it appears in the output
/// pattern.
pub type Bindings = HashMap<String, Json>;

/// What a computor returns.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputorOutput {
    /// A fresh value. Any non-null return here is treated as a new value
    /// and bumps the counter, even if it is structurally equal to the
    /// previous one; computors that want to suppress propagation must
    /// return [`ComputorOutput::Unchanged`] explicitly.
    Value(Json),
    /// The previous value is still current; do not bump the counter.
    Unchanged,
}

/// A computor: pure with respect to its inputs and previous value, with no
/// side effects that outlive a rolled-back batch.
pub trait Computor: Send + Sync {
    /// Compute (or reaffirm) this node's value.
    ///
    /// `inputs` are the current values of the node's declared input
    /// expressions, in declaration order. `previous` is the node's last
    /// stored value, if any. `bindings` are the concrete positional
    /// argument bindings for this instantiation.
    fn compute(&self, inputs: &[Json], previous: Option<&Json>, bindings: &Bindings) -> ComputorOutput;
}

impl<F> Computor for F
where
    F: Fn(&[Json], Option<&Json>, &Bindings) -> ComputorOutput + Send + Sync,
{
    fn compute(&self, inputs: &[Json], previous: Option<&Json>, bindings: &Bindings) -> ComputorOutput {
        self(inputs, previous, bindings)
    }
}

/// A boxed, type-erased computor, as stored inside a compiled schema.
pub type BoxedComputor = Box<dyn Computor>;

impl fmt::Debug for dyn Computor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<computor>")
    }
}
