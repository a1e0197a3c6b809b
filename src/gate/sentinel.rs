//! Sentinel files for per-suite test completion.

use std::path::PathBuf;
use std::process::Command;

use tracing::info;

use crate::error::{Result, SparkConnectError};

/// A directory of per-suite sentinel files.
///
/// A suite's sentinel exists only after the suite ran and passed; the
/// aggregator treats a missing file as an incomplete suite.
#[derive(Debug, Clone)]
pub struct SentinelDir {
    dir: PathBuf,
}

impl SentinelDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the sentinel file for `suite`.
    pub fn path_for(&self, suite: &str) -> PathBuf {
        self.dir.join(format!("{suite}.passed"))
    }

    /// Drop the sentinel for a passed suite.
    pub fn mark(&self, suite: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(suite), "")?;
        Ok(())
    }

    /// The subset of `suites` whose sentinel is absent, in the given
    /// order.
    pub fn missing<'a, I>(&self, suites: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        suites
            .into_iter()
            .filter(|suite| !self.path_for(suite).exists())
            .map(String::from)
            .collect()
    }

    /// Verify that every listed suite has completed.
    pub fn verify<'a, I>(&self, suites: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let missing = self.missing(suites);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SparkConnectError::SuitesIncomplete(missing))
        }
    }
}

/// Run a suite command and drop its sentinel on success.
///
/// The child's exit code is propagated either way; the sentinel write is
/// skipped when the command fails, so a crashed suite can never look
/// complete.
pub fn run_suite(sentinels: &SentinelDir, suite: &str, command: &[String]) -> Result<i32> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| SparkConnectError::InvalidConfig("empty suite command".to_string()))?;

    info!("running suite '{suite}': {}", command.join(" "));
    let status = Command::new(program).args(args).status()?;
    let code = status.code().unwrap_or(1);

    if status.success() {
        sentinels.mark(suite)?;
        info!("suite '{suite}' passed");
    } else {
        info!("suite '{suite}' failed with exit code {code}");
    }
    Ok(code)
}
