//! Bridge error types.

use thiserror::Error;

/// Errors that can occur on the helper-process bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The helper process failed to start.
    #[error("failed to spawn helper '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    /// The channel to the helper closed or errored. Every call pending at
    /// that moment fails with this; there is no reconnection.
    #[error("helper disconnected: {reason}")]
    Disconnected { reason: String },

    /// A request could not be serialized or written to the channel.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The helper answered the call with an error reply.
    #[error("helper call failed: {message}")]
    CallFailed { message: String },
}
