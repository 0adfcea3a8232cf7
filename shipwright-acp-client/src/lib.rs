//! Client for the Agent Client Protocol (ACP) over stdio
//!
//! This crate drives a coding agent that speaks ACP as newline-delimited
//! JSON-RPC 2.0 on its stdin/stdout:
//! - [`transport`] moves frames over a byte stream or a spawned process
//! - [`connection`] correlates requests with responses and dispatches the
//!   agent's callbacks to a [`ClientHandler`]
//! - [`session`] and [`capabilities`] hold the wire types
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use shipwright_acp_client::{
//!     AcpConnection, AgentCommand, ClientCapabilities, ContentBlock, NullClientHandler,
//!     ProcessTransport,
//! };
//! use std::sync::Arc;
//!
//! let transport = ProcessTransport::spawn(&AgentCommand::new("gemini").args(["--experimental-acp"]))?;
//! let connection = AcpConnection::start(Arc::new(transport), Arc::new(NullClientHandler));
//!
//! connection.initialize(ClientCapabilities::with_text_files()).await?;
//! let session = connection.new_session(project_dir).await?;
//! let result = connection
//!     .prompt(&session.session_id, vec![ContentBlock::text("Hello!")])
//!     .await?;
//! ```

pub mod capabilities;
pub mod connection;
pub mod error;
pub mod handler;
pub mod jsonrpc;
pub mod session;
pub mod transport;

pub use capabilities::{
    AgentCapabilities, ClientCapabilities, FileSystemCapability, InitializeParams,
    InitializeResult, PROTOCOL_VERSION, PromptCapabilities,
};
pub use connection::AcpConnection;
pub use error::{AcpError, AcpResult};
pub use handler::{ClientHandler, NullClientHandler};
pub use jsonrpc::{
    IncomingMessage, JSONRPC_VERSION, JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse,
    error_codes,
};
pub use session::{
    AcpSession, ContentBlock, PermissionOption, PermissionOptionKind, ReadTextFileParams,
    ReadTextFileResult, RequestPermissionOutcome, RequestPermissionParams,
    RequestPermissionResult, SessionCancelParams, SessionNewParams, SessionNewResult,
    SessionNotification, SessionPromptParams, SessionPromptResult, SessionState, SessionUpdate,
    StopReason, ToolCallStatus, WriteTextFileParams, WriteTextFileResult, methods,
};
pub use transport::{
    AgentCommand, DEFAULT_MAX_FRAME_BYTES, InboundFrame, ProcessTransport, StdioTransport,
    Transport,
};
