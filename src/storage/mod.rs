//! # Storage Layer
//!
//! Five typed sublevels per schema hash (`values`, `freshness`, `inputs`,
//! `revdeps`, `counters`), backed by `sled` trees, plus a
//! [`batch::BatchBuilder`] that stages writes across all five and commits
//! them atomically. See [`store::Store`] for the sublevel layout and
//! [`entities`] for the JSON shapes stored in each.

mod batch;
mod entities;
mod store;

pub use batch::BatchBuilder;
pub use entities::{Freshness, InputsRecord};
pub use store::{Store, Sublevel};
