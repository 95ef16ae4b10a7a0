//! Replay harness for the segfit allocator.
//!
//! This crate provides:
//! - Trace model: a versioned JSON schema for allocation traces
//! - Synthesis: deterministic synthetic workloads (churn, sawtooth, thrash)
//! - Replay: run a trace against a fresh heap with byte-level integrity
//!   verification and periodic consistency checks
//! - Report generation: machine-readable replay reports

#![forbid(unsafe_code)]

pub mod report;
pub mod runner;
pub mod trace;

pub use report::TraceReportV1;
pub use runner::TraceRunner;
pub use trace::{synthesize, TraceFileV1, TraceOp, Workload};
