//! Session configuration.
//!
//! A [`SessionConfig`] describes the session to create: runtime version,
//! Spark properties, labels, TTLs, and execution settings. Explicitly set
//! fields always win; [`SessionConfig::finalize`] fills the remaining gaps
//! from the client configuration and the detected environment before the
//! create request is sent.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use crate::auth::AuthenticationType;
use crate::config::ClientConfig;
use crate::environment;
use crate::error::{Result, SparkConnectError};

/// Runtime version used when the caller does not pick one.
pub const DEFAULT_RUNTIME_VERSION: &str = "2.3";

/// Labels managed by the client that users cannot override.
pub const SYSTEM_LABELS: [&str; 2] = ["dataproc-session-client", "goog-colab-notebook-id"];

const NOTEBOOK_LABEL_KEY: &str = "goog-colab-notebook-id";

/// Spark properties enabling BigQuery as the default datasource.
const BIGQUERY_DATASOURCE_PROPERTIES: [(&str, &str); 5] = [
    ("spark.datasource.bigquery.viewsEnabled", "true"),
    ("spark.datasource.bigquery.writeMethod", "direct"),
    (
        "spark.sql.catalog.spark_catalog",
        "com.google.cloud.spark.bigquery.BigQuerySparkSessionCatalog",
    ),
    ("spark.sql.legacy.createHiveTableByDefault", "false"),
    ("spark.sql.sources.default", "bigquery"),
];

/// Validates if a string complies with the label value format.
///
/// Only lowercase letters, numbers, and dashes are allowed. The value
/// must start and end with a lowercase letter or number. Maximum length
/// is 63 characters.
pub fn is_valid_label_value(value: &str) -> bool {
    if value.is_empty() || value.len() > 63 {
        return false;
    }
    let bytes = value.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return false;
    }
    bytes.iter().all(|&b| alnum(b) || b == b'-')
}

/// Configuration for a session to be created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    /// Runtime version (defaults to [`DEFAULT_RUNTIME_VERSION`]).
    pub runtime_version: Option<String>,
    /// Spark runtime properties.
    pub properties: BTreeMap<String, String>,
    /// User and system labels.
    pub labels: BTreeMap<String, String>,
    /// Session time-to-live in seconds.
    pub ttl_seconds: Option<u64>,
    /// Session idle time-to-live in seconds.
    pub idle_ttl_seconds: Option<u64>,
    /// Service account the workload runs as.
    pub service_account: Option<String>,
    /// Workload authentication type.
    pub auth_type: Option<AuthenticationType>,
    /// Subnetwork URI for execution.
    pub subnetwork_uri: Option<String>,
    /// Session template resource name.
    pub session_template: Option<String>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the runtime version.
    pub fn with_runtime_version(mut self, version: impl Into<String>) -> Self {
        self.runtime_version = Some(version.into());
        self
    }

    /// Set a single Spark property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the session time-to-live in seconds.
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl_seconds = Some(seconds);
        self
    }

    /// Set the idle time-to-live in seconds.
    pub fn with_idle_ttl_seconds(mut self, seconds: u64) -> Self {
        self.idle_ttl_seconds = Some(seconds);
        self
    }

    /// Set the service account the workload runs as.
    ///
    /// Also switches the authentication type to `SERVICE_ACCOUNT`,
    /// overriding any environment setting, so callers don't have to set
    /// both.
    pub fn with_service_account(mut self, account: impl Into<String>) -> Self {
        self.service_account = Some(account.into());
        self.auth_type = Some(AuthenticationType::ServiceAccount);
        self
    }

    /// Set the workload authentication type.
    pub fn with_auth_type(mut self, auth_type: AuthenticationType) -> Self {
        self.auth_type = Some(auth_type);
        self
    }

    /// Set the subnetwork URI.
    pub fn with_subnetwork(mut self, subnet: impl Into<String>) -> Self {
        self.subnetwork_uri = Some(subnet.into());
        self
    }

    /// Set the session template.
    pub fn with_session_template(mut self, template: impl Into<String>) -> Self {
        self.session_template = Some(template.into());
        self
    }

    /// Add a single label.
    ///
    /// System labels cannot be overridden and are dropped with a warning;
    /// values that do not comply with the label format are rejected.
    pub fn with_label(self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let mut labels = BTreeMap::new();
        labels.insert(key.into(), value.into());
        self.with_labels(labels)
    }

    /// Add multiple labels, with the same rules as [`Self::with_label`].
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Result<Self> {
        for (key, value) in labels {
            if SYSTEM_LABELS.contains(&key.as_str()) {
                warn!("label '{key}' is a system label and cannot be overridden by user, ignoring");
                continue;
            }
            if !is_valid_label_value(&value) {
                return Err(SparkConnectError::InvalidLabel(value));
            }
            self.labels.insert(key, value);
        }
        Ok(self)
    }

    /// Complete this configuration for submission.
    ///
    /// Fills unset fields from the client configuration, defaults the
    /// runtime version, stamps the client-environment label, picks up the
    /// notebook ID label, and merges default-datasource properties. Fields
    /// already set on `self` are never overwritten.
    pub fn finalize(
        &self,
        client: &ClientConfig,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<SessionConfig> {
        let mut config = self.clone();

        if config.runtime_version.is_none() {
            config.runtime_version = Some(DEFAULT_RUNTIME_VERSION.to_string());
        }
        if config.auth_type.is_none() {
            config.auth_type = client.auth_type;
        }
        if config.service_account.is_none() {
            config.service_account = client.service_account.clone();
        }
        if config.subnetwork_uri.is_none() {
            config.subnetwork_uri = client.subnet.clone();
        }
        if config.ttl_seconds.is_none() {
            config.ttl_seconds = client.ttl_seconds;
        }
        if config.idle_ttl_seconds.is_none() {
            config.idle_ttl_seconds = client.idle_ttl_seconds;
        }

        config.labels.insert(
            environment::CLIENT_LABEL_KEY.to_string(),
            environment::client_environment_label(env).to_string(),
        );

        if let Some(notebook) = env("COLAB_NOTEBOOK_ID") {
            // The variable carries a path; the last component is the ID.
            let notebook_id = Path::new(&notebook)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if is_valid_label_value(&notebook_id) {
                config
                    .labels
                    .insert(NOTEBOOK_LABEL_KEY.to_string(), notebook_id);
            } else {
                warn!(
                    "notebook ID '{notebook_id}' is not compliant with the label value format, \
                     ignoring notebook ID label"
                );
            }
        }

        if let Some(ref datasource) = client.default_datasource {
            if config.runtime_version.as_deref() == Some("2.3") {
                if datasource == "bigquery" {
                    // User-set properties take precedence over the defaults.
                    for (key, value) in BIGQUERY_DATASOURCE_PROPERTIES {
                        config
                            .properties
                            .entry(key.to_string())
                            .or_insert_with(|| value.to_string());
                    }
                } else {
                    warn!(
                        "default datasource is set to an invalid value: {datasource}. \
                         Supported value is 'bigquery'"
                    );
                }
            }
        }

        Ok(config)
    }
}
