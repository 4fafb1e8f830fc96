//! Durable snapshot files
//!
//! The whole engine state (graph arenas, embedding cache, model
//! parameters) is written as one self-describing file per graph version,
//! compressed and checksummed. Loading verifies magic, format version and
//! checksum before deserializing anything.

pub mod snapshot_store;

pub use snapshot_store::{LoadedState, PersistError, PersistResult, SnapshotStore};
