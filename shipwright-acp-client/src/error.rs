use crate::jsonrpc::JsonRpcError;
use std::path::PathBuf;
use thiserror::Error;

pub type AcpResult<T> = Result<T, AcpError>;

/// Failures surfaced by the ACP transport and connection
#[derive(Debug, Error)]
pub enum AcpError {
    /// The agent process exited or its pipes closed
    #[error("transport closed: {0}")]
    TransportClosed(String),

    /// The agent speaks a protocol version we do not support
    #[error("protocol mismatch: client speaks version {expected}, agent answered {actual}")]
    ProtocolMismatch { expected: u16, actual: u16 },

    /// The agent refused to open a session for the working directory
    #[error("session creation failed for {}: {message}", cwd.display())]
    SessionCreationFailed { cwd: PathBuf, message: String },

    /// A request other than `initialize` was issued before the handshake
    #[error("connection not initialized; call initialize() first")]
    NotInitialized,

    /// The agent answered a request with a JSON-RPC error
    #[error("agent returned an error for {method}: {error}")]
    Remote { method: String, error: JsonRpcError },

    /// The response to a request was longer than the frame limit
    #[error("response to {method} exceeded the frame size limit")]
    FrameTooLarge { method: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcpError {
    pub fn transport_closed(reason: impl Into<String>) -> Self {
        Self::TransportClosed(reason.into())
    }

    pub fn is_transport_closed(&self) -> bool {
        matches!(self, Self::TransportClosed(_))
    }
}
