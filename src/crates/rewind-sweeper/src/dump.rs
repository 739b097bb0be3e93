//! Dump sources: full-content exports of the stores under sweep
//!
//! Each [`DumpSource`] writes one artifact (`{label}.bin`) into the cycle's
//! output directory: a bincode-encoded vector of records. Three sources are
//! provided:
//!
//! - [`CacheDump`] - live content of any [`Cache`], with remaining TTLs
//! - [`DurableDump`] - full content of a [`DurableStore`]
//! - [`DirDump`] - an arbitrary directory tree, used by the standalone
//!   sweeper binary whose targets are plain paths

use crate::error::{Result, SweepError};
use async_trait::async_trait;
use rewind_checkpoint::{Cache, DurableStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Summary of one completed dump step
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DumpStats {
    /// Number of records written
    pub entries: u64,
    /// Payload bytes written (before artifact encoding)
    pub bytes: u64,
}

/// A store whose full content can be dumped into a snapshot set
#[async_trait]
pub trait DumpSource: Send + Sync {
    /// Artifact label; the artifact is written as `{label}.bin`
    fn label(&self) -> &str;

    /// Dump full content into `dir`, returning a summary
    async fn dump_to(&self, dir: &Path) -> Result<DumpStats>;
}

/// Atomic artifact write: unique temp file, fsync, rename into place.
async fn write_artifact(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact"),
        Uuid::new_v4()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut file = tokio::fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

async fn encode_and_write<T: Serialize>(
    dir: &Path,
    label: &str,
    records: &T,
    stats: DumpStats,
) -> Result<DumpStats> {
    let encoded = bincode::serialize(records)?;
    write_artifact(&dir.join(format!("{label}.bin")), &encoded).await?;
    Ok(stats)
}

/// Dump source over the fast cache
pub struct CacheDump {
    cache: Arc<dyn Cache>,
}

impl CacheDump {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl DumpSource for CacheDump {
    fn label(&self) -> &str {
        "cache"
    }

    async fn dump_to(&self, dir: &Path) -> Result<DumpStats> {
        let entries = self
            .cache
            .dump_entries()
            .await
            .map_err(|e| SweepError::step(self.label(), e))?;

        let stats = DumpStats {
            entries: entries.len() as u64,
            bytes: entries.iter().map(|(_, v, _)| v.len() as u64).sum(),
        };
        encode_and_write(dir, self.label(), &entries, stats).await
    }
}

/// Dump source over the durable store
pub struct DurableDump {
    durable: Arc<dyn DurableStore>,
}

impl DurableDump {
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self { durable }
    }
}

#[async_trait]
impl DumpSource for DurableDump {
    fn label(&self) -> &str {
        "durable-store"
    }

    async fn dump_to(&self, dir: &Path) -> Result<DumpStats> {
        let records = self
            .durable
            .export_records()
            .await
            .map_err(|e| SweepError::step(self.label(), e))?;

        let stats = DumpStats {
            entries: records.len() as u64,
            bytes: records.iter().map(|(_, v)| v.len() as u64).sum(),
        };
        encode_and_write(dir, self.label(), &records, stats).await
    }
}

/// Dump source over a plain directory tree
///
/// Used by the standalone binary, whose durable/cache targets are paths.
/// A missing target directory fails the step; a sweep of nothing must be
/// visible as misconfiguration, not recorded as an empty success.
pub struct DirDump {
    label: String,
    root: PathBuf,
}

impl DirDump {
    pub fn new(label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            root: root.into(),
        }
    }
}

#[async_trait]
impl DumpSource for DirDump {
    fn label(&self) -> &str {
        &self.label
    }

    async fn dump_to(&self, dir: &Path) -> Result<DumpStats> {
        if !self.root.is_dir() {
            return Err(SweepError::step(
                &self.label,
                format!("target directory {} does not exist", self.root.display()),
            ));
        }

        let mut records: Vec<(String, Vec<u8>)> = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .map_err(|e| SweepError::step(&self.label, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| SweepError::step(&self.label, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| SweepError::step(&self.label, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let rel = path
                        .strip_prefix(&self.root)
                        .map_err(|e| SweepError::step(&self.label, e))?
                        .to_string_lossy()
                        .into_owned();
                    match tokio::fs::read(&path).await {
                        Ok(bytes) => records.push((rel, bytes)),
                        // Deleted mid-walk: the dump reflects a live store.
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                        Err(e) => return Err(SweepError::step(&self.label, e)),
                    }
                }
            }
        }

        let stats = DumpStats {
            entries: records.len() as u64,
            bytes: records.iter().map(|(_, v)| v.len() as u64).sum(),
        };
        encode_and_write(dir, &self.label, &records, stats).await
    }
}
