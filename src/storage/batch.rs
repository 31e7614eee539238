//! The `BatchBuilder`: buffered reads that reflect pending writes
//! (read-your-writes), staged writes across all five sublevels, and an
//! atomic commit. Every `pull`/`invalidate` call stages its writes here
//! and commits exactly once, under the engine mutex; any error raised
//! before `commit` leaves the staged writes un-applied, so the caller
//! observes no partial state change.

use super::entities::{Freshness, InputsRecord};
use super::store::{Store, Sublevel};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// A staged entry: `Some` for a pending write, `None` for a pending
/// deletion.
type Staged = HashMap<(Sublevel, String), Option<Vec<u8>>>;

/// Accumulates writes across one `pull` or `invalidate` call and commits
/// them atomically.
pub struct BatchBuilder<'a> {
    store: &'a Store,
    staged: Staged,
}

impl<'a> BatchBuilder<'a> {
    /// Begin a new batch against `store`.
    pub fn new(store: &'a Store) -> Self {
        BatchBuilder {
            store,
            staged: HashMap::new(),
        }
    }

    /// Read a raw value, seeing this batch's own pending writes first.
    pub fn get_raw(&self, sub: Sublevel, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = self.staged.get(&(sub, key.to_string())) {
            return Ok(staged.clone());
        }
        self.store.get(sub, key)
    }

    /// Stage a raw write.
    pub fn put_raw(&mut self, sub: Sublevel, key: &str, value: Vec<u8>) {
        self.staged.insert((sub, key.to_string()), Some(value));
    }

    /// Stage a deletion.
    pub fn del_raw(&mut self, sub: Sublevel, key: &str) {
        self.staged.insert((sub, key.to_string()), None);
    }

    /// Read a JSON value.
    pub fn get_json<T: serde::de::DeserializeOwned>(&self, sub: Sublevel, key: &str) -> Result<Option<T>> {
        match self.get_raw(sub, key)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::corrupt("deserialize", key, e.to_string())),
        }
    }

    /// Stage a JSON write.
    pub fn put_json<T: serde::Serialize>(&mut self, sub: Sublevel, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| Error::corrupt("serialize", key, e.to_string()))?;
        self.put_raw(sub, key, bytes);
        Ok(())
    }

    /// Read the stored value for a node, if any.
    pub fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>> {
        self.get_json(Sublevel::Values, key)
    }

    /// Stage this node's value.
    pub fn put_value(&mut self, key: &str, value: &serde_json::Value) -> Result<()> {
        self.put_json(Sublevel::Values, key, value)
    }

    /// Read a node's freshness bit. Absent means the node has never been
    /// materialized into storage.
    pub fn get_freshness(&self, key: &str) -> Result<Option<Freshness>> {
        self.get_json(Sublevel::Freshness, key)
    }

    /// Stage a node's freshness bit.
    pub fn put_freshness(&mut self, key: &str, freshness: Freshness) -> Result<()> {
        self.put_json(Sublevel::Freshness, key, &freshness)
    }

    /// Read a node's inputs-record.
    pub fn get_inputs_record(&self, key: &str) -> Result<Option<InputsRecord>> {
        self.get_json(Sublevel::Inputs, key)
    }

    /// Stage a node's inputs-record.
    pub fn put_inputs_record(&mut self, key: &str, record: &InputsRecord) -> Result<()> {
        self.put_json(Sublevel::Inputs, key, record)
    }

    /// Read a node's version counter. Absent means no value has ever been
    /// computed for it.
    pub fn get_counter(&self, key: &str) -> Result<Option<u64>> {
        self.get_json(Sublevel::Counters, key)
    }

    /// Stage a node's version counter.
    pub fn put_counter(&mut self, key: &str, counter: u64) -> Result<()> {
        self.put_json(Sublevel::Counters, key, &counter)
    }

    /// Read the reverse-dependency list for an input key.
    pub fn get_revdeps(&self, input_key: &str) -> Result<Vec<String>> {
        Ok(self.get_json(Sublevel::Revdeps, input_key)?.unwrap_or_default())
    }

    /// Add `dependent` to `input_key`'s reverse-dependency list, if it is
    /// not already indexed there.
    pub fn index_revdep(&mut self, input_key: &str, dependent: &str) -> Result<()> {
        let mut deps = self.get_revdeps(input_key)?;
        if !deps.iter().any(|d| d == dependent) {
            deps.push(dependent.to_string());
            self.put_json(Sublevel::Revdeps, input_key, &deps)?;
        }
        Ok(())
    }

    /// Commit every staged write atomically, one `sled::Batch` per
    /// sublevel. The engine mutex held for the whole `pull`/`invalidate`
    /// call is what makes this commit indivisible from the perspective of
    /// any other caller; sled itself guarantees each individual tree's
    /// batch is all-or-nothing.
    pub fn commit(self) -> Result<()> {
        let mut batches: HashMap<Sublevel, sled::Batch> = HashMap::new();
        for ((sub, key), value) in self.staged {
            let batch = batches.entry(sub).or_default();
            match value {
                Some(bytes) => batch.insert(key.as_bytes(), bytes),
                None => batch.remove(key.as_bytes()),
            }
        }
        for (sub, batch) in batches {
            self.store
                .tree(sub)
                .apply_batch(batch)
                .map_err(|e| Error::storage("commit", "", e))?;
        }
        Ok(())
    }
}
