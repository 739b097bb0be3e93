//! Durable backing store for entity checkpoints
//!
//! Entity checkpoints live in the fast layer with a bounded TTL; the durable
//! store keeps a copy that outlives that window. The request path never reads
//! from here — the fast layer stays authoritative — but the durability sweep
//! and operator-driven recovery do.

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Durable persistence seam for entity checkpoints
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Persist one checkpoint
    async fn put(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Read a checkpoint back, if present
    async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        checkpoint_id: &str,
    ) -> Result<Option<Checkpoint>>;

    /// Full content as (relative path, bytes) records, for the durability sweep
    async fn export_records(&self) -> Result<Vec<(String, Vec<u8>)>>;
}

/// Filesystem-backed durable store
///
/// One JSON document per checkpoint under
/// `{root}/{entity_type}/{entity_id}/{checkpoint_id}.json`. Writes go through
/// a unique temp file, fsync, then an atomic rename, so a crash mid-write
/// never leaves a torn document.
#[derive(Debug, Clone)]
pub struct FsDurableStore {
    root: PathBuf,
}

impl FsDurableStore {
    /// Open a durable store rooted at `root` (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, entity_type: &str, entity_id: &str, checkpoint_id: &str) -> PathBuf {
        self.root
            .join(entity_type)
            .join(entity_id)
            .join(format!("{checkpoint_id}.json"))
    }
}

/// Atomic file write: unique temp file, fsync, rename into place.
async fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    // Unique temp name so concurrent writers of the same document never race
    // on the intermediate file.
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("doc"),
        Uuid::new_v4()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut file = tokio::fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;

    tokio::fs::rename(&temp_path, path).await?;

    // Rename durability requires the parent directory to reach disk on some
    // filesystems; best effort.
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir) = tokio::fs::File::open(parent).await {
                let _ = dir.sync_all().await;
            }
        }
    }

    Ok(())
}

#[async_trait]
impl DurableStore for FsDurableStore {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.document_path(
            &checkpoint.entity_type,
            &checkpoint.entity_id,
            &checkpoint.checkpoint_id,
        );
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(checkpoint)?;
        atomic_write(&path, &bytes).await?;
        Ok(())
    }

    async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        checkpoint_id: &str,
    ) -> Result<Option<Checkpoint>> {
        let path = self.document_path(entity_type, entity_id, checkpoint_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn export_records(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut records = Vec::new();
        if !self.root.exists() {
            return Ok(records);
        }

        // Iterative walk; the tree is at most three levels deep but renames
        // during the walk must not abort the export.
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let rel = path
                        .strip_prefix(&self.root)
                        .map_err(|_| {
                            std::io::Error::other("export path escaped durable root")
                        })?
                        .to_string_lossy()
                        .into_owned();
                    match tokio::fs::read(&path).await {
                        Ok(bytes) => records.push((rel, bytes)),
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDurableStore::new(dir.path());
        let checkpoint = Checkpoint::new("profile", "u123", json!({"score": 10}));

        store.put(&checkpoint).await.unwrap();

        let loaded = store
            .get("profile", "u123", &checkpoint.checkpoint_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, checkpoint);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDurableStore::new(dir.path());

        let loaded = store.get("profile", "u123", "nope").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_export_records_covers_all_entities() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDurableStore::new(dir.path());

        store
            .put(&Checkpoint::new("profile", "u1", json!(1)))
            .await
            .unwrap();
        store
            .put(&Checkpoint::new("assessment", "a1", json!(2)))
            .await
            .unwrap();

        let records = store.export_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|(rel, _)| rel.ends_with(".json")));
    }

    #[tokio::test]
    async fn test_export_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDurableStore::new(dir.path().join("never-created"));

        assert!(store.export_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDurableStore::new(dir.path());
        store
            .put(&Checkpoint::new("profile", "u1", json!({"score": 10})))
            .await
            .unwrap();

        let records = store.export_records().await.unwrap();
        assert!(records.iter().all(|(rel, _)| !rel.contains(".tmp")));
    }
}
