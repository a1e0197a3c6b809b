//! Session controller API surface.
//!
//! The [`SessionController`] trait is the seam between the session
//! manager and the service; [`HttpSessionController`] is the production
//! implementation speaking JSON/REST.

mod client;
mod types;

pub use client::{HttpSessionController, SessionController};
pub use types::{
    AuthenticationConfig, EnvironmentConfig, ExecutionConfig, Operation, RuntimeConfig,
    RuntimeInfo, Session, SparkConnectConfig, SPARK_CONNECT_ENDPOINT_KEY,
};
