//! Session management module.
//!
//! This module provides types and utilities for managing remote Spark
//! sessions: identifier generation, lifecycle state tracking, session
//! configuration, and the manager orchestrating creation, reuse, and
//! termination against the session controller API.

mod active;
mod config;
mod id;
mod manager;
mod state;

pub use active::ActiveSessionRecord;
pub use config::{is_valid_label_value, SessionConfig, DEFAULT_RUNTIME_VERSION, SYSTEM_LABELS};
pub use id::SessionId;
pub use manager::{ActiveSession, PollSettings, SessionManager, SessionProbe};
pub use state::SessionState;
