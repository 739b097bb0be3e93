//! Sweep cycle and scheduling
//!
//! One [`Sweeper`] owns two dump sources (durable store and fast cache), an
//! output root, and the last-known-good marker inside it. A cycle:
//!
//! 1. creates `{root}/{YYYYMMDD_HHMMSS}/`
//! 2. dumps the durable store there; aborts the cycle on failure
//! 3. dumps the cache there; aborts on failure likewise
//! 4. atomically swaps `{root}/last-known-good` to the new directory
//!
//! The swap is a single atomic replace (temp link + rename), never a
//! delete-then-create, so a crash between steps cannot leave the marker
//! missing or pointing at a partial set. Failed cycles leave the marker at
//! the previous complete set and are retried at the next interval.
//!
//! [`Sweeper::run`] drives cycles on a fixed interval from a single loop;
//! a new cycle cannot start before the previous one finishes.

use crate::config::{DEFAULT_INTERVAL_SECS, DEFAULT_RETAIN_SETS, DEFAULT_STEP_TIMEOUT_SECS};
use crate::dump::{DumpSource, DumpStats};
use crate::error::{Result, SweepError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Name of the last-known-good marker inside the output root
pub const MARKER_NAME: &str = "last-known-good";

/// Summary of one completed sweep cycle, also written as `manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// Directory holding this snapshot set
    pub dir: PathBuf,
    /// Durable-store dump summary
    pub durable: DumpStats,
    /// Cache dump summary
    pub cache: DumpStats,
    /// Completion timestamp
    pub completed_at: chrono::DateTime<Utc>,
}

/// The durability sweeper
pub struct Sweeper {
    durable: Arc<dyn DumpSource>,
    cache: Arc<dyn DumpSource>,
    output_root: PathBuf,
    interval: Duration,
    step_timeout: Duration,
    retain_sets: usize,
}

impl Sweeper {
    /// Create a sweeper with default interval, step timeout, and retention
    pub fn new(
        durable: Arc<dyn DumpSource>,
        cache: Arc<dyn DumpSource>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            durable,
            cache,
            output_root: output_root.into(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            retain_sets: DEFAULT_RETAIN_SETS,
        }
    }

    /// Override the sweep interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the hard per-step timeout
    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    /// Override how many completed sets are retained
    pub fn with_retention(mut self, retain_sets: usize) -> Self {
        self.retain_sets = retain_sets.max(1);
        self
    }

    /// The snapshot set the marker currently points at, if any
    pub fn last_known_good(&self) -> Option<PathBuf> {
        read_marker(&self.output_root)
    }

    /// Pick a fresh timestamped directory name under the output root.
    fn next_set_name(&self) -> String {
        let base = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut name = base.clone();
        let mut n = 1;
        while self.output_root.join(&name).exists() {
            name = format!("{base}_{n}");
            n += 1;
        }
        name
    }

    async fn run_step(&self, source: &Arc<dyn DumpSource>, dir: &Path) -> Result<DumpStats> {
        match tokio::time::timeout(self.step_timeout, source.dump_to(dir)).await {
            Ok(result) => result,
            Err(_) => Err(SweepError::step(
                source.label(),
                format!("timed out after {:?}", self.step_timeout),
            )),
        }
    }

    /// Run one sweep cycle
    pub async fn run_cycle(&self) -> Result<SweepReport> {
        tokio::fs::create_dir_all(&self.output_root).await?;

        let set_name = self.next_set_name();
        let set_dir = self.output_root.join(&set_name);
        tokio::fs::create_dir_all(&set_dir).await?;
        tracing::debug!(set = %set_name, "sweep cycle started");

        let durable = match self.run_step(&self.durable, &set_dir).await {
            Ok(stats) => stats,
            Err(e) => {
                self.discard_partial(&set_dir).await;
                return Err(e);
            }
        };

        let cache = match self.run_step(&self.cache, &set_dir).await {
            Ok(stats) => stats,
            Err(e) => {
                self.discard_partial(&set_dir).await;
                return Err(e);
            }
        };

        let report = SweepReport {
            dir: set_dir.clone(),
            durable,
            cache,
            completed_at: Utc::now(),
        };
        tokio::fs::write(
            set_dir.join("manifest.json"),
            serde_json::to_vec_pretty(&report)
                .map_err(|e| SweepError::step("manifest", e))?,
        )
        .await?;

        // Both dumps succeeded; only now may the marker advance.
        swap_marker(&self.output_root, &set_name)?;
        tracing::info!(
            set = %set_name,
            durable_entries = durable.entries,
            cache_entries = cache.entries,
            "sweep cycle complete, last-known-good advanced"
        );

        self.prune_old_sets(&set_name).await;
        Ok(report)
    }

    /// Run cycles indefinitely at the configured interval
    ///
    /// Cycle errors are logged and retried at the next tick; they never
    /// propagate. The sequential awaits are what prevent overlapping cycles.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = self.run_cycle().await {
                tracing::warn!(error = %e, "sweep cycle failed; retrying at next interval");
            }
        }
    }

    async fn discard_partial(&self, set_dir: &Path) {
        if let Err(e) = tokio::fs::remove_dir_all(set_dir).await {
            tracing::warn!(
                dir = %set_dir.display(),
                error = %e,
                "failed to remove partial snapshot set"
            );
        }
    }

    /// Count-based rotation of completed sets. The marker target is never
    /// pruned.
    async fn prune_old_sets(&self, current: &str) {
        let mut sets = match list_sets(&self.output_root).await {
            Ok(sets) => sets,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list snapshot sets for pruning");
                return;
            }
        };
        sets.sort();

        let excess = sets.len().saturating_sub(self.retain_sets);
        for name in sets.into_iter().take(excess) {
            if name == current {
                continue;
            }
            let path = self.output_root.join(&name);
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => tracing::debug!(set = %name, "pruned old snapshot set"),
                Err(e) => tracing::warn!(set = %name, error = %e, "failed to prune snapshot set"),
            }
        }
    }
}

async fn list_sets(root: &Path) -> std::io::Result<Vec<String>> {
    let mut sets = Vec::new();
    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // Timestamped set directories only; the marker and temp links are
        // siblings in the root.
        if entry.file_type().await?.is_dir() && name.chars().next().is_some_and(|c| c.is_ascii_digit())
        {
            sets.push(name);
        }
    }
    Ok(sets)
}

/// Atomically point `{root}/last-known-good` at `target`.
///
/// A temp link is created next to the marker and renamed over it; rename is
/// a single atomic replace, so the marker is never missing and never points
/// at a partial set.
#[cfg(unix)]
fn swap_marker(root: &Path, target: &str) -> std::io::Result<()> {
    let temp = root.join(format!(".{MARKER_NAME}.{}.tmp", Uuid::new_v4()));
    std::os::unix::fs::symlink(target, &temp)?;
    std::fs::rename(&temp, root.join(MARKER_NAME))?;
    Ok(())
}

/// Pointer-file fallback for platforms without symlinks; the temp-then-rename
/// replace keeps the same atomicity.
#[cfg(not(unix))]
fn swap_marker(root: &Path, target: &str) -> std::io::Result<()> {
    let temp = root.join(format!(".{MARKER_NAME}.{}.tmp", Uuid::new_v4()));
    std::fs::write(&temp, target.as_bytes())?;
    std::fs::rename(&temp, root.join(MARKER_NAME))?;
    Ok(())
}

/// Resolve the marker to the snapshot set it points at, if any
#[cfg(unix)]
pub fn read_marker(root: &Path) -> Option<PathBuf> {
    let target = std::fs::read_link(root.join(MARKER_NAME)).ok()?;
    Some(root.join(target))
}

/// Pointer-file fallback reader
#[cfg(not(unix))]
pub fn read_marker(root: &Path) -> Option<PathBuf> {
    let target = std::fs::read_to_string(root.join(MARKER_NAME)).ok()?;
    Some(root.join(target.trim()))
}
