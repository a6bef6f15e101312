//! Process bridge — line-delimited JSON over the helper's stdio.
//!
//! This module handles:
//! - Resolving how to launch the helper executable
//! - Spawning the helper child process
//! - One-line-per-message request/reply framing with correlation ids
//! - Failing pending calls and reporting the disconnect when the channel closes

pub mod config;
pub mod connection;
pub mod errors;
pub mod wire;

// Re-exports for convenience
pub use config::{resolve_helper_config, HelperConfig};
pub use connection::HelperConnection;
pub use errors::BridgeError;
pub use wire::{WireReply, WireRequest};
