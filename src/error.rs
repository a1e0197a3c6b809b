//! Error types for dataproc-spark-connect.

use thiserror::Error;

/// Status category of a session controller API error.
///
/// Mirrors the canonical error codes the service returns; only the codes
/// the client reacts to get their own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    /// The named session does not exist (HTTP 404).
    NotFound,
    /// The request was malformed (HTTP 400).
    InvalidArgument,
    /// The caller lacks permission (HTTP 403).
    PermissionDenied,
    /// A conflicting operation is still in progress (HTTP 409).
    Aborted,
    /// The session is not in a state that allows the operation (HTTP 412).
    FailedPrecondition,
    /// Any other non-success status.
    Internal,
}

impl ApiStatus {
    /// Map an HTTP status code to an API status category.
    pub fn from_http(status: u16) -> Self {
        match status {
            400 => ApiStatus::InvalidArgument,
            403 => ApiStatus::PermissionDenied,
            404 => ApiStatus::NotFound,
            409 => ApiStatus::Aborted,
            412 => ApiStatus::FailedPrecondition,
            _ => ApiStatus::Internal,
        }
    }
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ApiStatus::NotFound => "NOT_FOUND",
            ApiStatus::InvalidArgument => "INVALID_ARGUMENT",
            ApiStatus::PermissionDenied => "PERMISSION_DENIED",
            ApiStatus::Aborted => "ABORTED",
            ApiStatus::FailedPrecondition => "FAILED_PRECONDITION",
            ApiStatus::Internal => "INTERNAL",
        };
        f.write_str(name)
    }
}

/// Main error type for dataproc-spark-connect operations.
#[derive(Error, Debug)]
pub enum SparkConnectError {
    /// Required configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unrecognized authentication type spelling.
    #[error("unknown authentication type: {0}")]
    InvalidAuthType(String),

    /// No access token could be obtained.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The session controller API rejected a request.
    #[error("session controller error ({status}): {message}")]
    Api { status: ApiStatus, message: String },

    /// Session creation was rejected by the service.
    #[error("error while creating session: {0}")]
    SessionCreation(String),

    /// The session entered the FAILED state.
    #[error("session {0} failed")]
    SessionFailed(String),

    /// Session termination did not complete.
    #[error("session termination failed: {0}")]
    TerminationFailed(String),

    /// The session reported no Spark Connect endpoint.
    #[error("session {0} has no Spark Connect endpoint")]
    EndpointMissing(String),

    /// A session identifier could not be parsed.
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::session::SessionState,
        to: crate::session::SessionState,
    },

    /// A label value does not comply with the label format.
    #[error("invalid label value: {0}")]
    InvalidLabel(String),

    /// A package requirement string could not be parsed.
    #[error("invalid package requirement: {0}")]
    InvalidRequirement(String),

    /// The combined version specifiers of one or more packages are
    /// unsatisfiable.
    #[error("inconsistent package specifiers: {}", .0.join(", "))]
    InconsistentRequirements(Vec<String>),

    /// One or more required build steps did not succeed.
    #[error("build steps did not succeed: {}", .0.join(", "))]
    BuildStepsFailed(Vec<String>),

    /// One or more test suites have not dropped their sentinel file.
    #[error("test suites did not complete: {}", .0.join(", "))]
    SuitesIncomplete(Vec<String>),

    /// Websocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A polling loop exceeded its deadline.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

impl SparkConnectError {
    /// Check whether this is an API error with the given status.
    pub fn is_api_status(&self, status: ApiStatus) -> bool {
        matches!(self, SparkConnectError::Api { status: s, .. } if *s == status)
    }
}

/// Convenience Result type for dataproc-spark-connect operations.
pub type Result<T> = std::result::Result<T, SparkConnectError>;
