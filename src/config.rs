//! Client configuration for dataproc-spark-connect.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Default values
//!
//! The environment variables follow the documented surface of the client:
//! `GOOGLE_CLOUD_PROJECT`, `GOOGLE_CLOUD_REGION`, and the
//! `DATAPROC_SPARK_CONNECT_*` family.

use std::path::PathBuf;

use crate::auth::AuthenticationType;
use crate::cli::Args;
use crate::error::{Result, SparkConnectError};

/// Environment variable names consumed by the client.
pub mod env_vars {
    pub const PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
    pub const REGION: &str = "GOOGLE_CLOUD_REGION";
    pub const CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
    pub const API_ENDPOINT: &str = "GOOGLE_CLOUD_DATAPROC_API_ENDPOINT";
    pub const AUTH_TYPE: &str = "DATAPROC_SPARK_CONNECT_AUTH_TYPE";
    pub const SERVICE_ACCOUNT: &str = "DATAPROC_SPARK_CONNECT_SERVICE_ACCOUNT";
    pub const TTL_SECONDS: &str = "DATAPROC_SPARK_CONNECT_TTL_SECONDS";
    pub const IDLE_TTL_SECONDS: &str = "DATAPROC_SPARK_CONNECT_IDLE_TTL_SECONDS";
    pub const TERMINATE_AT_EXIT: &str = "DATAPROC_SPARK_CONNECT_SESSION_TERMINATE_AT_EXIT";
    pub const ACTIVE_SESSION_FILE: &str = "DATAPROC_SPARK_CONNECT_ACTIVE_SESSION_FILE_PATH";
    pub const DEFAULT_DATASOURCE: &str = "DATAPROC_SPARK_CONNECT_DEFAULT_DATASOURCE";
    pub const SUBNET: &str = "DATAPROC_SPARK_CONNECT_SUBNET";
}

/// Read a variable from the process environment.
///
/// This is the default lookup passed to [`ClientConfig::from_lookup`];
/// tests supply their own closure instead of mutating process globals.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Client configuration resolved from the environment and CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Google Cloud project ID.
    pub project_id: Option<String>,
    /// Google Cloud region the sessions live in.
    pub region: Option<String>,
    /// Custom API endpoint override (host, no scheme).
    pub api_endpoint: Option<String>,
    /// Path to an application credentials file.
    pub credentials_file: Option<PathBuf>,
    /// Workload authentication type.
    pub auth_type: Option<AuthenticationType>,
    /// Service account the session workload runs as.
    pub service_account: Option<String>,
    /// Session time-to-live in seconds.
    pub ttl_seconds: Option<u64>,
    /// Session idle time-to-live in seconds.
    pub idle_ttl_seconds: Option<u64>,
    /// Terminate the tracked session when the client exits.
    pub terminate_at_exit: bool,
    /// Path of the active-session info file.
    pub active_session_file: Option<PathBuf>,
    /// Default datasource to configure ("bigquery" is the only valid value).
    pub default_datasource: Option<String>,
    /// Subnetwork URI for session execution.
    pub subnet: Option<String>,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&process_env)
    }

    /// Load configuration through an arbitrary environment lookup.
    pub fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let auth_type = match env(env_vars::AUTH_TYPE) {
            Some(raw) => Some(raw.parse::<AuthenticationType>()?),
            None => None,
        };

        Ok(Self {
            project_id: env(env_vars::PROJECT),
            region: env(env_vars::REGION),
            api_endpoint: env(env_vars::API_ENDPOINT),
            credentials_file: env(env_vars::CREDENTIALS).map(PathBuf::from),
            auth_type,
            service_account: env(env_vars::SERVICE_ACCOUNT),
            ttl_seconds: parse_seconds(env(env_vars::TTL_SECONDS), env_vars::TTL_SECONDS)?,
            idle_ttl_seconds: parse_seconds(
                env(env_vars::IDLE_TTL_SECONDS),
                env_vars::IDLE_TTL_SECONDS,
            )?,
            terminate_at_exit: env(env_vars::TERMINATE_AT_EXIT).as_deref() == Some("true"),
            active_session_file: env(env_vars::ACTIVE_SESSION_FILE).map(PathBuf::from),
            default_datasource: env(env_vars::DEFAULT_DATASOURCE),
            subnet: env(env_vars::SUBNET),
        })
    }

    /// Apply CLI argument overrides (highest priority).
    pub fn apply_args(&mut self, args: &Args) -> Result<()> {
        if let Some(ref project) = args.project {
            self.project_id = Some(project.clone());
        }
        if let Some(ref region) = args.region {
            self.region = Some(region.clone());
        }
        if let Some(ref endpoint) = args.endpoint {
            self.api_endpoint = Some(endpoint.clone());
        }
        if let Some(ref account) = args.service_account {
            self.service_account = Some(account.clone());
        }
        if let Some(ref auth_type) = args.auth_type {
            self.auth_type = Some(auth_type.parse()?);
        }
        if let Some(ttl) = args.ttl_seconds {
            self.ttl_seconds = Some(ttl);
        }
        if let Some(idle) = args.idle_ttl_seconds {
            self.idle_ttl_seconds = Some(idle);
        }
        if let Some(ref subnet) = args.subnet {
            self.subnet = Some(subnet.clone());
        }
        if let Some(ref path) = args.session_file {
            self.active_session_file = Some(path.clone());
        }
        if args.terminate_at_exit {
            self.terminate_at_exit = true;
        }
        Ok(())
    }

    /// The API endpoint host, defaulting to the regional endpoint.
    pub fn endpoint(&self) -> Result<String> {
        if let Some(ref endpoint) = self.api_endpoint {
            return Ok(endpoint.clone());
        }
        let region = self.region.as_deref().ok_or_else(|| {
            SparkConnectError::InvalidConfig(format!("{} is not set", env_vars::REGION))
        })?;
        Ok(format!("{region}-dataproc.googleapis.com"))
    }

    /// The resource parent for sessions: `projects/{p}/locations/{r}`.
    pub fn parent(&self) -> Result<String> {
        let project = self.project_id.as_deref().ok_or_else(|| {
            SparkConnectError::InvalidConfig(format!("{} is not set", env_vars::PROJECT))
        })?;
        let region = self.region.as_deref().ok_or_else(|| {
            SparkConnectError::InvalidConfig(format!("{} is not set", env_vars::REGION))
        })?;
        Ok(format!("projects/{project}/locations/{region}"))
    }

    /// Verify that everything session creation needs is present.
    pub fn validate(&self) -> Result<()> {
        self.parent().map(|_| ())
    }
}

fn parse_seconds(raw: Option<String>, var: &str) -> Result<Option<u64>> {
    match raw {
        None => Ok(None),
        Some(s) => s.parse::<u64>().map(Some).map_err(|_| {
            SparkConnectError::InvalidConfig(format!("{var} must be an integer, got '{s}'"))
        }),
    }
}
