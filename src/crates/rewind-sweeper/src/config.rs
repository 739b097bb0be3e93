//! Sweeper configuration
//!
//! All parameters come from flags or environment variables; there is no
//! configuration file. Defaults match the operational profile: a 1800 s
//! interval and a hard per-step timeout.

use clap::Parser;
use std::path::PathBuf;

/// Default sweep interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 1800;

/// Default hard timeout for a single dump step, in seconds
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 300;

/// Default number of completed snapshot sets to retain
pub const DEFAULT_RETAIN_SETS: usize = 48;

/// Configuration for the durability sweeper process
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rewind-sweeper",
    about = "Periodically dumps the durable store and fast cache to long-term storage"
)]
pub struct SweeperConfig {
    /// Durable-store connection target (directory to dump)
    #[arg(long, env = "SWEEP_DURABLE_TARGET")]
    pub durable_target: PathBuf,

    /// Cache connection target (directory to dump)
    #[arg(long, env = "SWEEP_CACHE_TARGET")]
    pub cache_target: PathBuf,

    /// Root directory receiving timestamped snapshot sets
    #[arg(long, env = "SWEEP_OUTPUT_ROOT")]
    pub output_root: PathBuf,

    /// Sweep interval in seconds
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Hard timeout for each dump step, in seconds
    #[arg(long, env = "SWEEP_STEP_TIMEOUT_SECS", default_value_t = DEFAULT_STEP_TIMEOUT_SECS)]
    pub step_timeout_secs: u64,

    /// Completed snapshot sets to retain; older sets are pruned
    #[arg(long, env = "SWEEP_RETAIN_SETS", default_value_t = DEFAULT_RETAIN_SETS)]
    pub retain_sets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SweeperConfig::parse_from([
            "rewind-sweeper",
            "--durable-target",
            "/data/durable",
            "--cache-target",
            "/data/cache",
            "--output-root",
            "/backups",
        ]);

        assert_eq!(config.interval_secs, 1800);
        assert_eq!(config.step_timeout_secs, 300);
        assert_eq!(config.retain_sets, 48);
    }

    #[test]
    fn test_flag_overrides() {
        let config = SweeperConfig::parse_from([
            "rewind-sweeper",
            "--durable-target",
            "/data/durable",
            "--cache-target",
            "/data/cache",
            "--output-root",
            "/backups",
            "--interval-secs",
            "60",
            "--retain-sets",
            "3",
        ]);

        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.retain_sets, 3);
    }
}
