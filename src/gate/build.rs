//! Build-status verification.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SparkConnectError};

/// Status of a single build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Queued,
    Pending,
    Working,
    Success,
    Failure,
    InternalError,
    Timeout,
    Cancelled,
    Expired,
    /// Status not recognized by this client version; never a success.
    #[serde(other)]
    Unknown,
}

impl StepStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StepStatus::Success)
    }
}

/// One step of a build.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildStep {
    /// Step identifier.
    pub id: String,
    /// Reported status.
    pub status: StepStatus,
    /// Steps marked skippable never gate the build.
    #[serde(rename = "allowFailure", default)]
    pub allow_failure: bool,
}

/// The queried description of a build: a sequence of steps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildDescription {
    #[serde(default)]
    pub steps: Vec<BuildStep>,
}

impl BuildDescription {
    /// Parse a build description from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a build description from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// IDs of required steps that did not succeed, in encounter order.
    pub fn failing_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|step| !step.allow_failure && !step.status.is_success())
            .map(|step| step.id.as_str())
            .collect()
    }

    /// Verify the build: every step must have succeeded unless it is
    /// marked skippable.
    ///
    /// The error carries all failing step IDs, which the gate reports as
    /// one aggregated message.
    pub fn verify(&self) -> Result<()> {
        let failing = self.failing_steps();
        if failing.is_empty() {
            Ok(())
        } else {
            Err(SparkConnectError::BuildStepsFailed(
                failing.into_iter().map(String::from).collect(),
            ))
        }
    }
}
