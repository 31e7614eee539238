//! Persistent entity shapes stored in the `freshness` and `inputs`
//! sublevels.

use serde::{Deserialize, Serialize};

/// The dirty-bit tracked per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Freshness {
    /// The stored value is current and may be returned without recomputation.
    UpToDate,
    /// The node must be re-examined on its next `pull`.
    PotentiallyOutdated,
}

/// Snapshot of `(input keys, input counters)` recorded at a node's last
/// successful compute. Used by the counter-skip optimization and as the
/// schema-change guard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputsRecord {
    /// Canonical keys of this node's inputs, in declaration order.
    pub inputs: Vec<String>,
    /// The counter value observed for each input at last compute, aligned
    /// positionally with `inputs`.
    pub input_counters: Vec<u64>,
}
