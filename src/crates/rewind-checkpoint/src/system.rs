//! Whole-system checkpoint manager
//!
//! System checkpoints capture a caller-supplied descriptor of overall system
//! state (typically before a simulation run, a migration window, or exposing
//! an AI decision to a human reviewer). The manager stores and returns the
//! descriptor; restoring actual subsystem state from it is the caller's
//! responsibility, mirroring the entity store's separation of concerns.
//!
//! System checkpoints are never mutated and never expire; they are retained
//! until explicitly superseded via [`SystemCheckpointManager::remove`] or
//! [`SystemCheckpointManager::clear`].

use crate::checkpoint::{SystemCheckpoint, SystemCheckpointId};
use crate::error::{CheckpointError, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Store of whole-system checkpoints
#[derive(Default)]
pub struct SystemCheckpointManager {
    checkpoints: RwLock<HashMap<SystemCheckpointId, SystemCheckpoint>>,
}

impl SystemCheckpointManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a system checkpoint from a caller-supplied descriptor
    pub async fn snapshot(
        &self,
        tag: impl Into<String>,
        description: serde_json::Value,
    ) -> Result<SystemCheckpointId> {
        let checkpoint = SystemCheckpoint::new(tag, description);
        let id = checkpoint.id.clone();
        tracing::info!(system_checkpoint_id = %id, tag = %checkpoint.tag, "system checkpoint created");
        self.checkpoints.write().await.insert(id.clone(), checkpoint);
        Ok(id)
    }

    /// Return the stored descriptor for a checkpoint id
    pub async fn restore(&self, id: &str) -> Result<SystemCheckpoint> {
        self.checkpoints
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| {
                CheckpointError::NotFound(format!("system checkpoint {id} not found"))
            })
    }

    /// All retained checkpoints, newest first
    pub async fn list(&self) -> Vec<SystemCheckpoint> {
        let mut checkpoints: Vec<_> = self.checkpoints.read().await.values().cloned().collect();
        checkpoints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        checkpoints
    }

    /// Explicitly supersede one checkpoint
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.checkpoints
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| {
                CheckpointError::NotFound(format!("system checkpoint {id} not found"))
            })
    }

    /// Number of retained checkpoints
    pub async fn count(&self) -> usize {
        self.checkpoints.read().await.len()
    }

    /// Drop all retained checkpoints
    pub async fn clear(&self) {
        self.checkpoints.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_snapshot_and_restore() {
        let manager = SystemCheckpointManager::new();
        let description = json!({"entities": ["profile:u123"], "queue_depth": 4});

        let id = manager
            .snapshot("pre-migration", description.clone())
            .await
            .unwrap();
        let restored = manager.restore(&id).await.unwrap();

        assert_eq!(restored.id, id);
        assert_eq!(restored.tag, "pre-migration");
        assert_eq!(restored.description, description);
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let manager = SystemCheckpointManager::new();
        let err = manager.restore("nope").await.unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_restore_does_not_consume() {
        let manager = SystemCheckpointManager::new();
        let id = manager.snapshot("simulation", json!(1)).await.unwrap();

        let first = manager.restore(&id).await.unwrap();
        let second = manager.restore(&id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.count().await, 1);
    }

    #[tokio::test]
    async fn test_explicit_supersession() {
        let manager = SystemCheckpointManager::new();
        let id1 = manager.snapshot("simulation", json!(1)).await.unwrap();
        let id2 = manager.snapshot("simulation", json!(2)).await.unwrap();

        manager.remove(&id1).await.unwrap();
        assert!(manager.restore(&id1).await.is_err());
        assert!(manager.restore(&id2).await.is_ok());

        manager.clear().await;
        assert_eq!(manager.count().await, 0);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let manager = SystemCheckpointManager::new();
        manager.snapshot("a", json!(1)).await.unwrap();
        manager.snapshot("b", json!(2)).await.unwrap();

        let listed = manager.list().await;
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
    }
}
