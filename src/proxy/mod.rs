//! Local tunneling proxy.
//!
//! The driver's Spark Connect client speaks plain gRPC to
//! `sc://localhost:{port}`; this module owns that local port and tunnels
//! every connection to the remote session endpoint over a websocket.

mod tunnel;

pub use tunnel::{pump, websocket_url, SessionProxy};
