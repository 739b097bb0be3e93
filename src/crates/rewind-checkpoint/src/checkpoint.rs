//! Core checkpoint data structures for entity and system snapshots
//!
//! This module defines the two snapshot types the engine stores:
//!
//! - [`Checkpoint`] - an immutable, timestamped snapshot of one entity's
//!   state, keyed by `(entity_type, entity_id, checkpoint_id)`. The state
//!   blob is opaque: it is serialized and returned verbatim, never
//!   interpreted.
//! - [`SystemCheckpoint`] - a coarse, caller-defined snapshot of broader
//!   system state, used for test/simulation recovery rather than per-entity
//!   rollback.
//!
//! Checkpoint identifiers are full-length random UUIDs. Collisions are
//! therefore structurally impossible rather than merely improbable, and ids
//! carry no information about the entity or creation time.
//!
//! # Fast-layer key shape
//!
//! ```text
//! checkpoint:{entity_type}:{entity_id}:{checkpoint_id} -> serialized Checkpoint
//! checkpoint:latest:{entity_type}:{entity_id}          -> checkpoint_id
//! ```
//!
//! The latest pointer is overwritten on every new checkpoint for the entity
//! (last-writer-wins, no merge) and never independently expires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Checkpoint ID type
pub type CheckpointId = String;

/// System checkpoint ID type
pub type SystemCheckpointId = String;

/// Fast-layer retention window for entity checkpoints: 7 days.
pub const RETENTION_SECS: u64 = 7 * 24 * 3600;

/// An immutable snapshot of one entity's state at a point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// Entity category, e.g. "profile", "assessment", "match"
    pub entity_type: String,

    /// Identifier of the entity within its category
    pub entity_id: String,

    /// Unique identifier of this snapshot (UUID v4)
    pub checkpoint_id: CheckpointId,

    /// Opaque serialized state, owned exclusively by the entity's subsystem
    pub state: serde_json::Value,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Create a new checkpoint for an entity, assigning a fresh id
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        state: serde_json::Value,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            checkpoint_id: Uuid::new_v4().to_string(),
            state,
            created_at: Utc::now(),
        }
    }

    /// Fast-layer key under which this checkpoint is stored
    pub fn storage_key(&self) -> String {
        checkpoint_key(&self.entity_type, &self.entity_id, &self.checkpoint_id)
    }
}

/// Fast-layer key for a specific checkpoint
pub fn checkpoint_key(entity_type: &str, entity_id: &str, checkpoint_id: &str) -> String {
    format!("checkpoint:{entity_type}:{entity_id}:{checkpoint_id}")
}

/// Fast-layer key for an entity's latest pointer
pub fn latest_key(entity_type: &str, entity_id: &str) -> String {
    format!("checkpoint:latest:{entity_type}:{entity_id}")
}

/// Fast-layer key prefix covering all checkpoints of one entity
pub fn entity_prefix(entity_type: &str, entity_id: &str) -> String {
    format!("checkpoint:{entity_type}:{entity_id}:")
}

/// A point-in-time bundle describing overall system state
///
/// Created explicitly, never mutated, retained until explicitly superseded.
/// The engine does not enumerate entities itself; the caller decides what
/// "system state" means for a given use and supplies the description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemCheckpoint {
    /// Unique identifier of this system checkpoint (UUID v4)
    pub id: SystemCheckpointId,

    /// Coarse classification tag, e.g. "pre-migration", "simulation"
    pub tag: String,

    /// Caller-constructed state description
    pub description: serde_json::Value,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl SystemCheckpoint {
    /// Create a new system checkpoint with a fresh id
    pub fn new(tag: impl Into<String>, description: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tag: tag.into(),
            description,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkpoint_creation() {
        let checkpoint = Checkpoint::new("profile", "u123", json!({"score": 10}));
        assert_eq!(checkpoint.entity_type, "profile");
        assert_eq!(checkpoint.entity_id, "u123");
        assert_eq!(checkpoint.state, json!({"score": 10}));
        assert!(!checkpoint.checkpoint_id.is_empty());
    }

    #[test]
    fn test_checkpoint_ids_are_unique() {
        let a = Checkpoint::new("profile", "u123", json!({}));
        let b = Checkpoint::new("profile", "u123", json!({}));
        assert_ne!(a.checkpoint_id, b.checkpoint_id);
    }

    #[test]
    fn test_key_shape() {
        let checkpoint = Checkpoint::new("match", "m42", json!(null));
        assert_eq!(
            checkpoint.storage_key(),
            format!("checkpoint:match:m42:{}", checkpoint.checkpoint_id)
        );
        assert_eq!(latest_key("match", "m42"), "checkpoint:latest:match:m42");
        assert!(checkpoint.storage_key().starts_with(&entity_prefix("match", "m42")));
    }

    #[test]
    fn test_system_checkpoint_creation() {
        let sc = SystemCheckpoint::new("simulation", json!({"entities": ["u123"]}));
        assert_eq!(sc.tag, "simulation");
        assert_eq!(sc.description, json!({"entities": ["u123"]}));
        assert!(!sc.id.is_empty());
    }
}
