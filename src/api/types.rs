//! Wire types for the session controller REST API.
//!
//! Field names follow the service's JSON representation (camelCase);
//! protobuf durations are encoded as decimal seconds with an `s` suffix.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::auth::AuthenticationType;
use crate::session::{SessionConfig, SessionState};

/// Key under which the service publishes the Spark Connect endpoint.
pub const SPARK_CONNECT_ENDPOINT_KEY: &str = "Spark Connect Server";

/// A session resource, used both in create requests and responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    /// Fully-qualified resource name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Server-assigned UUID (output only).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    /// Lifecycle state (output only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<SessionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_config: Option<RuntimeConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_config: Option<EnvironmentConfig>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_template: Option<String>,
    /// Marks the session as a Spark Connect session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spark_connect_session: Option<SparkConnectConfig>,
    /// Runtime information (output only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_info: Option<RuntimeInfo>,
}

impl Session {
    /// Build the create-request body for a finalized session configuration.
    pub fn from_config(name: impl Into<String>, config: &SessionConfig) -> Self {
        let execution_config = ExecutionConfig {
            service_account: config.service_account.clone(),
            subnetwork_uri: config.subnetwork_uri.clone(),
            ttl: config.ttl_seconds.map(encode_duration),
            idle_ttl: config.idle_ttl_seconds.map(encode_duration),
            authentication_config: config.auth_type.map(|auth_type| AuthenticationConfig {
                user_workload_authentication_type: Some(auth_type),
            }),
        };

        Self {
            name: name.into(),
            runtime_config: Some(RuntimeConfig {
                version: config.runtime_version.clone(),
                properties: config.properties.clone(),
            }),
            environment_config: Some(EnvironmentConfig {
                execution_config: Some(execution_config),
            }),
            labels: config.labels.clone(),
            session_template: config.session_template.clone(),
            spark_connect_session: Some(SparkConnectConfig {}),
            ..Self::default()
        }
    }

    /// The session's lifecycle state, defaulting to `Creating` when the
    /// service omitted it.
    pub fn state(&self) -> SessionState {
        self.state.unwrap_or_default()
    }

    /// The Spark Connect endpoint published by the runtime, if any.
    pub fn spark_connect_endpoint(&self) -> Option<&str> {
        self.runtime_info
            .as_ref()
            .and_then(|info| info.endpoints.get(SPARK_CONNECT_ENDPOINT_KEY))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_config: Option<ExecutionConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetwork_uri: Option<String>,
    /// Session TTL as a protobuf duration, e.g. `"3600s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    /// Idle TTL as a protobuf duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_config: Option<AuthenticationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthenticationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_workload_authentication_type: Option<AuthenticationType>,
}

/// Empty marker message selecting the Spark Connect session kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparkConnectConfig {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeInfo {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, String>,
}

/// A long-running operation handle returned by session creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Operation {
    pub name: String,
    pub done: bool,
}

fn encode_duration(seconds: u64) -> String {
    format!("{seconds}s")
}
