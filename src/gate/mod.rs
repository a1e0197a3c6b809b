//! CI gating helpers.
//!
//! Two small pieces of release plumbing: verification of a build
//! description (fail when any required step did not succeed) and
//! sentinel files signalling per-suite test completion to a downstream
//! aggregator.

mod build;
mod sentinel;

pub use build::{BuildDescription, BuildStep, StepStatus};
pub use sentinel::{run_suite, SentinelDir};
