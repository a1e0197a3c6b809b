//! # dataproc-spark-connect
//!
//! Client for managed Dataproc Spark Connect sessions.
//!
//! This crate connects a driver process to a managed, remote Spark
//! execution service over a session-based RPC protocol. It owns the
//! session lifecycle (creation, reuse, TTLs, termination-at-exit) and
//! runs a local TCP proxy that tunnels the driver's Spark Connect RPC
//! bytes to the remote session endpoint over a websocket transport.
//!
//! ## Features
//!
//! - **Session lifecycle**: create, attach-or-create, and terminate
//!   managed sessions with state polling
//! - **Tunneling proxy**: local `sc://localhost:{port}` endpoint bridged
//!   to the remote session over websockets
//! - **Environment-driven configuration**: the documented
//!   `DATAPROC_SPARK_CONNECT_*` and `GOOGLE_CLOUD_*` variables
//! - **Artifact staging**: validated package requirement manifests
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dataproc_spark_connect::api::HttpSessionController;
//! use dataproc_spark_connect::proxy::SessionProxy;
//! use dataproc_spark_connect::{auth, ClientConfig, SessionConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> dataproc_spark_connect::Result<()> {
//!     dataproc_spark_connect::logging::try_init().ok();
//!
//!     let config = ClientConfig::from_env()?;
//!     let tokens = auth::default_provider(&dataproc_spark_connect::config::process_env);
//!     let controller = Arc::new(HttpSessionController::new(&config.endpoint()?, tokens));
//!     let manager = Arc::new(SessionManager::new(controller, config));
//!
//!     let session = manager.get_or_create(&SessionConfig::new()).await?;
//!     let proxy = SessionProxy::start(&session.endpoint, manager).await?;
//!     println!("connect to {}", proxy.connect_url());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod artifacts;
pub mod auth;
pub mod cli;
pub mod config;
pub mod console;
pub mod environment;
pub mod error;
pub mod gate;
pub mod logging;
pub mod proxy;
pub mod session;

// Re-export commonly used types
pub use artifacts::{ArtifactManifest, Requirement};
pub use auth::{AccessTokenProvider, AuthenticationType};
pub use config::ClientConfig;
pub use error::{ApiStatus, Result, SparkConnectError};
pub use gate::{BuildDescription, SentinelDir};
pub use session::{
    ActiveSession, SessionConfig, SessionId, SessionManager, SessionProbe, SessionState,
};
