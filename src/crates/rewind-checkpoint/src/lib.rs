//! # rewind-checkpoint - Versioned Snapshot/Restore for Entity and System State
//!
//! Checkpoint engine for the rewind platform: snapshots entity and system
//! state before risky or irreversible operations (AI-driven matching,
//! assessment scoring, human-review decisions) and rolls any entity — or the
//! whole system — back to a prior snapshot.
//!
//! ## Overview
//!
//! The engine reconciles two layers:
//!
//! - a **fast, expiring cache** ([`Cache`] / [`InMemoryCache`]) holding every
//!   checkpoint under a 7-day retention TTL, with an O(1) latest pointer per
//!   entity, and
//! - a **durable backing store** ([`DurableStore`] / [`FsDurableStore`])
//!   receiving an asynchronous copy of each checkpoint, read only by
//!   operator tooling and the out-of-band durability sweep.
//!
//! "Exactly one current version" holds under concurrent writers: latest
//! pointers are linearized by the cache's atomic set, and concurrent
//! checkpoints for one entity leave the pointer naming exactly one of them.
//!
//! ## Core Types
//!
//! - [`EntityCheckpointStore`] - checkpoint / get / rollback per entity
//! - [`SystemCheckpointManager`] - coarse whole-system snapshots for
//!   simulation and pre-migration windows
//! - [`RestoreRegistry`] / [`RestoreHandler`] - per-entity-type dispatch of
//!   restored state back to the owning subsystem
//! - [`SnapshotCodec`] - serialization seam ([`JsonCodec`], [`BincodeCodec`])
//! - [`CheckpointError`] - error taxonomy (`NotFound`, `StoreUnavailable`, ...)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rewind_checkpoint::{EntityCheckpointStore, InMemoryCache};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = EntityCheckpointStore::new(Arc::new(InMemoryCache::new()));
//!
//!     // Snapshot before a risky mutation; abort the mutation if this fails.
//!     let c1 = store.checkpoint("profile", "u123", json!({"score": 10})).await?;
//!
//!     // ... mutation runs, reviewer rejects it ...
//!
//!     // Hand the prior state back to the owning subsystem.
//!     let state = store.rollback("profile", "u123", Some(&c1)).await?;
//!     assert_eq!(state, json!({"score": 10}));
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod checkpoint;
pub mod codec;
pub mod durable;
pub mod error;
pub mod registry;
pub mod store;
pub mod system;

// Re-export main types
pub use cache::{Cache, DumpedEntry, InMemoryCache};
pub use checkpoint::{
    checkpoint_key, entity_prefix, latest_key, Checkpoint, CheckpointId, SystemCheckpoint,
    SystemCheckpointId, RETENTION_SECS,
};
pub use codec::{BincodeCodec, JsonCodec, SnapshotCodec};
pub use durable::{DurableStore, FsDurableStore};
pub use error::{CheckpointError, Result};
pub use registry::{RestoreHandler, RestoreRegistry};
pub use store::{EntityCheckpointStore, DEFAULT_OP_TIMEOUT};
pub use system::SystemCheckpointManager;
