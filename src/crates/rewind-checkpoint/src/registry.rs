//! Restore-handler registry: dispatching state back to owning subsystems
//!
//! The checkpoint engine never implements domain restore logic. Each owning
//! subsystem (matching, assessment, review) registers a [`RestoreHandler`]
//! keyed by entity type; callers fetch state with
//! [`EntityCheckpointStore::rollback`](crate::store::EntityCheckpointStore::rollback)
//! and hand it to [`RestoreRegistry::apply`], which dispatches to the
//! registered handler.

use crate::error::{CheckpointError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Callback a subsystem supplies to apply restored state onto itself
#[async_trait]
pub trait RestoreHandler: Send + Sync {
    /// Apply `state` to the identified entity; an error means the subsystem
    /// rejected or failed the restore
    async fn apply(
        &self,
        entity_type: &str,
        entity_id: &str,
        state: &serde_json::Value,
    ) -> Result<()>;
}

/// Registry of restore handlers keyed by entity type
#[derive(Default)]
pub struct RestoreRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn RestoreHandler>>>,
}

impl RestoreRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for an entity type
    pub async fn register(&self, entity_type: impl Into<String>, handler: Arc<dyn RestoreHandler>) {
        let entity_type = entity_type.into();
        tracing::debug!(entity_type = %entity_type, "restore handler registered");
        self.handlers.write().await.insert(entity_type, handler);
    }

    /// Whether a handler is registered for `entity_type`
    pub async fn is_registered(&self, entity_type: &str) -> bool {
        self.handlers.read().await.contains_key(entity_type)
    }

    /// Dispatch restored state to the owning subsystem's handler
    pub async fn apply(
        &self,
        entity_type: &str,
        entity_id: &str,
        state: &serde_json::Value,
    ) -> Result<()> {
        let handler = self
            .handlers
            .read()
            .await
            .get(entity_type)
            .cloned()
            .ok_or_else(|| {
                CheckpointError::Invalid(format!(
                    "no restore handler registered for entity type {entity_type}"
                ))
            })?;

        handler.apply(entity_type, entity_id, state).await?;
        tracing::info!(entity_type, entity_id, "restored state applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Stand-in for an owning subsystem: records the last applied state.
    #[derive(Default)]
    struct ProfileSubsystem {
        applied: Mutex<Option<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl RestoreHandler for ProfileSubsystem {
        async fn apply(
            &self,
            _entity_type: &str,
            entity_id: &str,
            state: &serde_json::Value,
        ) -> Result<()> {
            *self.applied.lock().await = Some((entity_id.to_string(), state.clone()));
            Ok(())
        }
    }

    struct RejectingSubsystem;

    #[async_trait]
    impl RestoreHandler for RejectingSubsystem {
        async fn apply(
            &self,
            _entity_type: &str,
            _entity_id: &str,
            _state: &serde_json::Value,
        ) -> Result<()> {
            Err(CheckpointError::Restore("validation failed".into()))
        }
    }

    #[tokio::test]
    async fn test_dispatch_to_registered_handler() {
        let registry = RestoreRegistry::new();
        let subsystem = Arc::new(ProfileSubsystem::default());
        registry.register("profile", subsystem.clone()).await;

        registry
            .apply("profile", "u123", &json!({"score": 10}))
            .await
            .unwrap();

        let applied = subsystem.applied.lock().await.clone();
        assert_eq!(applied, Some(("u123".to_string(), json!({"score": 10}))));
    }

    #[tokio::test]
    async fn test_unregistered_type_is_an_error() {
        let registry = RestoreRegistry::new();
        let err = registry
            .apply("assessment", "a1", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_handler_failure_propagates() {
        let registry = RestoreRegistry::new();
        registry.register("review", Arc::new(RejectingSubsystem)).await;

        let err = registry.apply("review", "r1", &json!({})).await.unwrap_err();
        assert!(matches!(err, CheckpointError::Restore(_)));
    }

    #[tokio::test]
    async fn test_reregistering_replaces_handler() {
        let registry = RestoreRegistry::new();
        registry.register("profile", Arc::new(RejectingSubsystem)).await;
        let subsystem = Arc::new(ProfileSubsystem::default());
        registry.register("profile", subsystem.clone()).await;

        registry.apply("profile", "u1", &json!(1)).await.unwrap();
        assert!(subsystem.applied.lock().await.is_some());
    }
}
