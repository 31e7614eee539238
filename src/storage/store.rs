//! # Storage Layer
//!
//! Opens the five typed sublevels (`values`, `freshness`, `inputs`,
//! `revdeps`, `counters`) for one schema hash as distinct `sled` trees
//! under `<schema_hash>/<sublevel>`.

use crate::error::{Error, Result};
use sled::Tree;

/// The five typed sub-stores every schema owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sublevel {
    /// Memoized computor output, keyed by node key.
    Values,
    /// Dirty-bit, keyed by node key.
    Freshness,
    /// Inputs-record snapshot, keyed by node key.
    Inputs,
    /// Reverse-dependency lists, keyed by *input* node key.
    Revdeps,
    /// Version counters, keyed by node key.
    Counters,
}

impl Sublevel {
    fn name(self) -> &'static str {
        match self {
            Sublevel::Values => "values",
            Sublevel::Freshness => "freshness",
            Sublevel::Inputs => "inputs",
            Sublevel::Revdeps => "revdeps",
            Sublevel::Counters => "counters",
        }
    }

    /// All five sublevels, for iteration during open/cleanup.
    pub const ALL: [Sublevel; 5] = [
        Sublevel::Values,
        Sublevel::Freshness,
        Sublevel::Inputs,
        Sublevel::Revdeps,
        Sublevel::Counters,
    ];
}

/// Owns the five sublevel trees for one schema hash, plus the underlying
/// `sled::Db` handle (kept so that whole-schema cleanup can drop every
/// tree at once; see [`Store::drop_schema`]).
pub struct Store {
    db: sled::Db,
    schema_hash: String,
    values: Tree,
    freshness: Tree,
    inputs: Tree,
    revdeps: Tree,
    counters: Tree,
}

impl Store {
    /// Open (or create) the five sublevel trees for `schema_hash` inside
    /// `db`.
    pub fn open(db: sled::Db, schema_hash: &str) -> Result<Self> {
        let open_tree = |sub: Sublevel| -> Result<Tree> {
            let name = format!("{schema_hash}/{}", sub.name());
            db.open_tree(name.as_bytes())
                .map_err(|e| Error::storage("open_tree", name, e))
        };

        Ok(Store {
            values: open_tree(Sublevel::Values)?,
            freshness: open_tree(Sublevel::Freshness)?,
            inputs: open_tree(Sublevel::Inputs)?,
            revdeps: open_tree(Sublevel::Revdeps)?,
            counters: open_tree(Sublevel::Counters)?,
            schema_hash: schema_hash.to_string(),
            db,
        })
    }

    pub(crate) fn tree(&self, sub: Sublevel) -> &Tree {
        match sub {
            Sublevel::Values => &self.values,
            Sublevel::Freshness => &self.freshness,
            Sublevel::Inputs => &self.inputs,
            Sublevel::Revdeps => &self.revdeps,
            Sublevel::Counters => &self.counters,
        }
    }

    /// Read a raw value from a sublevel. Returns `Ok(None)` on a missing
    /// key — absence is not an error.
    pub fn get(&self, sub: Sublevel, key: &str) -> Result<Option<Vec<u8>>> {
        self.tree(sub)
            .get(key.as_bytes())
            .map(|opt| opt.map(|v| v.to_vec()))
            .map_err(|e| Error::storage("get", key, e))
    }

    /// All keys currently present in a sublevel, decoded as UTF-8 strings.
    /// Used by debug accessors (`list_materialized_nodes`) rather than by the
    /// evaluation/invalidation hot paths.
    pub fn keys(&self, sub: Sublevel) -> Result<Vec<String>> {
        self.tree(sub)
            .iter()
            .keys()
            .map(|r| {
                r.map_err(|e| Error::storage("keys", "", e)).map(|k| {
                    String::from_utf8_lossy(&k).into_owned()
                })
            })
            .collect()
    }

    /// The schema hash this store is namespaced under.
    pub fn schema_hash(&self) -> &str {
        &self.schema_hash
    }

    /// Drop every sublevel tree for this schema hash at once. Nodes are
    /// never deleted individually; the only supported cleanup is dropping
    /// an entire schema's state in one shot.
    pub fn drop_schema(&self) -> Result<()> {
        for sub in Sublevel::ALL {
            let name = format!("{}/{}", self.schema_hash, sub.name());
            self.db
                .drop_tree(name.as_bytes())
                .map_err(|e| Error::storage("drop_tree", name, e))?;
        }
        Ok(())
    }
}
