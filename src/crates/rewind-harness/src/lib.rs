//! # rewind-harness - Simulation and Recovery Validation
//!
//! Drives destructive checkpoint → mutate → restore cycles against the
//! checkpoint engine: simulation runs where state mutation is disposable,
//! human-in-the-loop workflow validation (snapshot before the reviewer sees
//! a decision, roll back on rejection), and rapid-fire recovery stress
//! tests.
//!
//! See [`SimulationHarness`].

pub mod harness;

pub use harness::{SimulationHarness, StressSummary, WorkflowValidation};
