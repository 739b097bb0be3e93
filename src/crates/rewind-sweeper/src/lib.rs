//! # rewind-sweeper - Out-of-Band Durability Sweep
//!
//! An independent, indefinitely-looping process that copies both the durable
//! store and the fast cache to long-term storage on a fixed interval, and
//! advances a `last-known-good` marker only when a full snapshot set has been
//! written. The sweeper never participates in the request path; request-side
//! callers neither wait on it nor observe its failures.
//!
//! Output layout:
//!
//! ```text
//! {root}/{YYYYMMDD_HHMMSS}/durable-store.bin
//! {root}/{YYYYMMDD_HHMMSS}/cache.bin
//! {root}/{YYYYMMDD_HHMMSS}/manifest.json
//! {root}/last-known-good -> {YYYYMMDD_HHMMSS}
//! ```
//!
//! The marker only ever moves forward to a complete set, via a single atomic
//! replace. See [`Sweeper`] for the cycle semantics and [`SweeperConfig`]
//! for the environment-configurable parameters.

pub mod config;
pub mod dump;
pub mod error;
pub mod sweep;

pub use config::SweeperConfig;
pub use dump::{CacheDump, DirDump, DumpSource, DumpStats, DurableDump};
pub use error::{Result, SweepError};
pub use sweep::{read_marker, SweepReport, Sweeper, MARKER_NAME};
