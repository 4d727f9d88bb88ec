//! Typed error kinds for the bridge.
//!
//! `main` maps these to the exit codes documented in the CLI contract:
//! 0 clean shutdown, 1 fatal I/O, 2 configuration error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("host write unavailable: {0}")]
    TransientWriteUnavailable(#[source] std::io::Error),

    #[error("input source disconnected")]
    SourceDisconnected,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("fatal I/O error: {0}")]
    FatalIO(#[source] std::io::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl BridgeError {
    /// Process exit code per the CLI contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            BridgeError::FatalIO(_) => 1,
            BridgeError::ConfigError(_) => 2,
            BridgeError::TransientWriteUnavailable(_)
            | BridgeError::SourceDisconnected
            | BridgeError::ProtocolViolation(_) => 0,
        }
    }
}
