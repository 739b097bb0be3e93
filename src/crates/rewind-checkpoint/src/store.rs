//! Entity checkpoint store: versioned snapshots in the fast layer
//!
//! [`EntityCheckpointStore`] is the write path every risky mutation goes
//! through: `checkpoint()` snapshots the entity's current state before the
//! mutation runs, and `rollback()` hands the state back if the mutation is
//! rejected or fails. Checkpoint-before-mutate is a hard precondition — a
//! failed checkpoint aborts the caller's operation, it is never best-effort.
//!
//! Storage layout in the fast layer:
//!
//! - each checkpoint is written under its own key with the retention TTL
//! - a per-entity latest pointer is atomically overwritten on every new
//!   checkpoint, so "most recent" lookups are O(1) without scanning
//!
//! The latest pointer never expires on its own. Once the checkpoint it names
//! has aged out, the pointer is dangling: `get()` then returns `NotFound`
//! rather than silently substituting an older version, and the event is
//! logged distinctly.
//!
//! The store never calls into owning subsystems. `rollback()` returns the
//! state blob; applying it belongs to the caller (see the restore-handler
//! registry).

use crate::cache::Cache;
use crate::checkpoint::{
    checkpoint_key, entity_prefix, latest_key, Checkpoint, CheckpointId, RETENTION_SECS,
};
use crate::codec::{JsonCodec, SnapshotCodec};
use crate::durable::DurableStore;
use crate::error::{CheckpointError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const LATEST_PREFIX: &str = "checkpoint:latest:";

/// Default bound on a single fast-store call
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-entity versioned checkpoint store over a fast TTL-bound cache
pub struct EntityCheckpointStore<S: SnapshotCodec = JsonCodec> {
    cache: Arc<dyn Cache>,
    durable: Option<Arc<dyn DurableStore>>,
    codec: S,
    retention: Duration,
    op_timeout: Duration,
}

impl EntityCheckpointStore<JsonCodec> {
    /// Create a store over `cache` with the default JSON codec and the
    /// 7-day retention window
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self::with_codec(cache, JsonCodec::new())
    }
}

impl<S: SnapshotCodec> EntityCheckpointStore<S> {
    /// Create a store with an explicit snapshot codec
    pub fn with_codec(cache: Arc<dyn Cache>, codec: S) -> Self {
        Self {
            cache,
            durable: None,
            codec,
            retention: Duration::from_secs(RETENTION_SECS),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Attach a durable store; every checkpoint gets an asynchronous copy
    pub fn with_durable(mut self, durable: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(durable);
        self
    }

    /// Override the fast-layer retention window (tests, ops)
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Override the per-call timeout on fast-store operations
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Bound a cache call and fold failures into `StoreUnavailable`.
    ///
    /// A timeout is a failure, not retried here; retry policy belongs to the
    /// caller.
    async fn cache_call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CheckpointError::StoreUnavailable(format!("{op}: {e}"))),
            Err(_) => Err(CheckpointError::StoreUnavailable(format!(
                "{op}: timed out after {:?}",
                self.op_timeout
            ))),
        }
    }

    /// Snapshot an entity's current state, returning the new checkpoint id.
    ///
    /// Writes the checkpoint under the retention TTL, then atomically
    /// overwrites the entity's latest pointer. On failure the caller's
    /// mutating operation must abort.
    pub async fn checkpoint(
        &self,
        entity_type: &str,
        entity_id: &str,
        state: serde_json::Value,
    ) -> Result<CheckpointId> {
        let checkpoint = Checkpoint::new(entity_type, entity_id, state);
        let bytes = self.codec.encode(&checkpoint)?;

        self.cache_call(
            "write checkpoint",
            self.cache
                .set_ex(&checkpoint.storage_key(), bytes, self.retention),
        )
        .await?;

        self.cache_call(
            "advance latest pointer",
            self.cache.set(
                &latest_key(entity_type, entity_id),
                checkpoint.checkpoint_id.clone().into_bytes(),
            ),
        )
        .await?;

        tracing::debug!(
            entity_type,
            entity_id,
            checkpoint_id = %checkpoint.checkpoint_id,
            "checkpoint created"
        );

        // Durable copy off the request path; failures are logged, never
        // surfaced — the fast-layer write above is the precondition.
        if let Some(durable) = self.durable.clone() {
            let copy = checkpoint.clone();
            tokio::spawn(async move {
                if let Err(e) = durable.put(&copy).await {
                    tracing::warn!(
                        entity_type = %copy.entity_type,
                        entity_id = %copy.entity_id,
                        checkpoint_id = %copy.checkpoint_id,
                        error = %e,
                        "durable checkpoint copy failed"
                    );
                }
            });
        }

        Ok(checkpoint.checkpoint_id)
    }

    async fn fetch(
        &self,
        entity_type: &str,
        entity_id: &str,
        checkpoint_id: &str,
    ) -> Result<Option<Checkpoint>> {
        let key = checkpoint_key(entity_type, entity_id, checkpoint_id);
        let bytes = self.cache_call("read checkpoint", self.cache.get(&key)).await?;
        match bytes {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Fetch a checkpoint, resolving via the latest pointer when no id is
    /// given.
    ///
    /// A dangling pointer (the named checkpoint has expired) returns
    /// `NotFound` — the store does not substitute an older version.
    pub async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<Checkpoint> {
        let not_found = || {
            CheckpointError::NotFound(format!(
                "no checkpoint for {entity_type}:{entity_id}"
            ))
        };

        match checkpoint_id {
            Some(id) => self
                .fetch(entity_type, entity_id, id)
                .await?
                .ok_or_else(|| {
                    CheckpointError::NotFound(format!(
                        "checkpoint {id} not found for {entity_type}:{entity_id}"
                    ))
                }),
            None => {
                let pointer = self
                    .cache_call(
                        "read latest pointer",
                        self.cache.get(&latest_key(entity_type, entity_id)),
                    )
                    .await?;
                let Some(pointer) = pointer else {
                    return Err(not_found());
                };
                let id = String::from_utf8(pointer).map_err(|_| {
                    CheckpointError::Invalid(format!(
                        "latest pointer for {entity_type}:{entity_id} is not valid utf-8"
                    ))
                })?;
                match self.fetch(entity_type, entity_id, &id).await? {
                    Some(checkpoint) => Ok(checkpoint),
                    None => {
                        tracing::warn!(
                            entity_type,
                            entity_id,
                            checkpoint_id = %id,
                            "dangling latest pointer: referenced checkpoint expired from fast store"
                        );
                        Err(not_found())
                    }
                }
            }
        }
    }

    /// Fetch a checkpoint's state blob for the caller to apply.
    ///
    /// Idempotent: repeated calls with the same id return identical state and
    /// cause no store side effects. Applying the state back onto the owning
    /// subsystem is the caller's responsibility.
    pub async fn rollback(
        &self,
        entity_type: &str,
        entity_id: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<serde_json::Value> {
        let checkpoint = self.get(entity_type, entity_id, checkpoint_id).await?;
        tracing::info!(
            entity_type,
            entity_id,
            checkpoint_id = %checkpoint.checkpoint_id,
            "rollback state served"
        );
        Ok(checkpoint.state)
    }

    /// All live checkpoints for an entity, newest first
    pub async fn list(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Checkpoint>> {
        let entries = self
            .cache_call(
                "scan checkpoints",
                self.cache.scan(&entity_prefix(entity_type, entity_id)),
            )
            .await?;

        let mut checkpoints = Vec::with_capacity(entries.len());
        for (_, bytes) in entries {
            checkpoints.push(self.codec.decode::<Checkpoint>(&bytes)?);
        }
        checkpoints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(checkpoints)
    }

    /// Drop all checkpoints and the latest pointer for one entity
    pub async fn purge_entity(&self, entity_type: &str, entity_id: &str) -> Result<()> {
        let entries = self
            .cache_call(
                "scan checkpoints",
                self.cache.scan(&entity_prefix(entity_type, entity_id)),
            )
            .await?;
        for (key, _) in entries {
            self.cache_call("delete checkpoint", self.cache.delete(&key))
                .await?;
        }
        self.cache_call(
            "delete latest pointer",
            self.cache.delete(&latest_key(entity_type, entity_id)),
        )
        .await?;
        Ok(())
    }

    /// Total number of live checkpoints across all entities
    pub async fn checkpoint_count(&self) -> Result<usize> {
        let entries = self
            .cache_call("scan checkpoints", self.cache.scan("checkpoint:"))
            .await?;
        Ok(entries
            .iter()
            .filter(|(key, _)| !key.starts_with(LATEST_PREFIX))
            .count())
    }

    /// Drop every checkpoint and pointer (useful for testing)
    pub async fn clear(&self) -> Result<()> {
        let entries = self
            .cache_call("scan checkpoints", self.cache.scan("checkpoint:"))
            .await?;
        for (key, _) in entries {
            self.cache_call("delete checkpoint", self.cache.delete(&key))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DumpedEntry, InMemoryCache};
    use crate::durable::FsDurableStore;
    use async_trait::async_trait;
    use serde_json::json;

    fn store() -> (Arc<InMemoryCache>, EntityCheckpointStore) {
        let cache = Arc::new(InMemoryCache::new());
        let store = EntityCheckpointStore::new(cache.clone());
        (cache, store)
    }

    /// Cache double that refuses every call, as an unreachable backend would.
    struct FailingCache;

    #[async_trait]
    impl Cache for FailingCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(CheckpointError::StoreUnavailable("connection refused".into()))
        }
        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            Err(CheckpointError::StoreUnavailable("connection refused".into()))
        }
        async fn set_ex(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
            Err(CheckpointError::StoreUnavailable("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(CheckpointError::StoreUnavailable("connection refused".into()))
        }
        async fn scan(&self, _prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
            Err(CheckpointError::StoreUnavailable("connection refused".into()))
        }
        async fn dump_entries(&self) -> Result<Vec<DumpedEntry>> {
            Err(CheckpointError::StoreUnavailable("connection refused".into()))
        }
    }

    /// Cache double that hangs forever, as a stalled backend would.
    struct HangingCache;

    #[async_trait]
    impl Cache for HangingCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            std::future::pending().await
        }
        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            std::future::pending().await
        }
        async fn set_ex(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
            std::future::pending().await
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            std::future::pending().await
        }
        async fn scan(&self, _prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
            std::future::pending().await
        }
        async fn dump_entries(&self) -> Result<Vec<DumpedEntry>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (_, store) = store();
        let state = json!({"score": 10, "tags": ["senior", "rust"]});

        let id = store.checkpoint("profile", "u123", state.clone()).await.unwrap();
        let loaded = store.get("profile", "u123", Some(&id)).await.unwrap();

        assert_eq!(loaded.state, state);
        assert_eq!(loaded.entity_type, "profile");
        assert_eq!(loaded.entity_id, "u123");
    }

    #[tokio::test]
    async fn test_latest_and_explicit_version() {
        let (_, store) = store();

        let c1 = store
            .checkpoint("profile", "u123", json!({"score": 10}))
            .await
            .unwrap();
        let c2 = store
            .checkpoint("profile", "u123", json!({"score": 20}))
            .await
            .unwrap();
        assert_ne!(c1, c2);

        let latest = store.get("profile", "u123", None).await.unwrap();
        assert_eq!(latest.state, json!({"score": 20}));
        assert_eq!(latest.checkpoint_id, c2);

        let old = store.get("profile", "u123", Some(&c1)).await.unwrap();
        assert_eq!(old.state, json!({"score": 10}));
    }

    #[tokio::test]
    async fn test_latest_pointer_after_sequential_checkpoints() {
        let (_, store) = store();

        let mut last = String::new();
        for i in 0..5 {
            last = store
                .checkpoint("assessment", "a9", json!({"iteration": i}))
                .await
                .unwrap();
        }

        let latest = store.get("assessment", "a9", None).await.unwrap();
        assert_eq!(latest.checkpoint_id, last);
        assert_eq!(latest.state, json!({"iteration": 4}));
    }

    #[tokio::test]
    async fn test_unknown_entity_is_not_found() {
        let (_, store) = store();
        let err = store.get("profile", "ghost", None).await.unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkpoint_expires_after_retention() {
        let (_, store) = store();

        let id = store
            .checkpoint("profile", "u123", json!({"score": 10}))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(RETENTION_SECS + 1)).await;

        let err = store.get("profile", "u123", Some(&id)).await.unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dangling_pointer_is_not_found_not_substituted() {
        let (cache, store) = store();

        store
            .checkpoint("profile", "u123", json!({"score": 10}))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(RETENTION_SECS + 1)).await;

        // The pointer itself never expires; it is dangling now.
        let pointer = cache.get(&latest_key("profile", "u123")).await.unwrap();
        assert!(pointer.is_some());

        let err = store.get("profile", "u123", None).await.unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rollback_is_idempotent() {
        let (_, store) = store();

        let id = store
            .checkpoint("profile", "u123", json!({"score": 10}))
            .await
            .unwrap();
        store
            .checkpoint("profile", "u123", json!({"score": 20}))
            .await
            .unwrap();
        let count_before = store.checkpoint_count().await.unwrap();

        let first = store.rollback("profile", "u123", Some(&id)).await.unwrap();
        let second = store.rollback("profile", "u123", Some(&id)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, json!({"score": 10}));
        assert_eq!(store.checkpoint_count().await.unwrap(), count_before);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_checkpoint() {
        let store = EntityCheckpointStore::new(Arc::new(FailingCache));
        let err = store
            .checkpoint("profile", "u123", json!({"score": 10}))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::StoreUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out_as_unavailable() {
        let store = EntityCheckpointStore::new(Arc::new(HangingCache))
            .with_op_timeout(Duration::from_secs(1));
        let err = store
            .checkpoint("profile", "u123", json!({"score": 10}))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_durable_copy_written_off_request_path() {
        let dir = tempfile::tempdir().unwrap();
        let durable = Arc::new(FsDurableStore::new(dir.path()));
        let store = EntityCheckpointStore::new(Arc::new(InMemoryCache::new()))
            .with_durable(durable.clone());

        let id = store
            .checkpoint("profile", "u123", json!({"score": 10}))
            .await
            .unwrap();

        let copied = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(cp) = durable.get("profile", "u123", &id).await.unwrap() {
                    return cp;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("durable copy never appeared");
        assert_eq!(copied.state, json!({"score": 10}));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (_, store) = store();
        for i in 0..3 {
            store
                .checkpoint("match", "m1", json!({"round": i}))
                .await
                .unwrap();
        }

        let listed = store.list("match", "m1").await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].state, json!({"round": 2}));
        assert_eq!(listed[2].state, json!({"round": 0}));
    }

    #[tokio::test]
    async fn test_purge_entity_removes_pointer_and_versions() {
        let (_, store) = store();
        store
            .checkpoint("profile", "u123", json!({"score": 10}))
            .await
            .unwrap();
        store
            .checkpoint("profile", "other", json!({"score": 1}))
            .await
            .unwrap();

        store.purge_entity("profile", "u123").await.unwrap();

        assert!(matches!(
            store.get("profile", "u123", None).await.unwrap_err(),
            CheckpointError::NotFound(_)
        ));
        assert!(store.get("profile", "other", None).await.is_ok());
        assert_eq!(store.checkpoint_count().await.unwrap(), 1);
    }
}
