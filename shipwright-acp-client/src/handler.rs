//! Callbacks the agent may invoke on the client
//!
//! The connection's reader loop decodes agent-initiated requests and
//! notifications and hands them to a [`ClientHandler`]. Whatever a handler
//! returns is sent back verbatim; an `Err` becomes a JSON-RPC error response.

use crate::jsonrpc::JsonRpcError;
use crate::session::{
    ReadTextFileParams, ReadTextFileResult, RequestPermissionParams, RequestPermissionResult,
    SessionNotification, WriteTextFileParams, WriteTextFileResult, methods,
};
use async_trait::async_trait;

#[async_trait]
pub trait ClientHandler: Send + Sync + 'static {
    /// `session/request_permission`; cancelled unless overridden
    async fn request_permission(
        &self,
        _params: RequestPermissionParams,
    ) -> Result<RequestPermissionResult, JsonRpcError> {
        Ok(RequestPermissionResult::cancelled())
    }

    /// `fs/read_text_file`; unsupported unless overridden
    async fn read_text_file(
        &self,
        _params: ReadTextFileParams,
    ) -> Result<ReadTextFileResult, JsonRpcError> {
        Err(JsonRpcError::method_not_found(methods::FS_READ_TEXT_FILE))
    }

    /// `fs/write_text_file`; unsupported unless overridden
    async fn write_text_file(
        &self,
        _params: WriteTextFileParams,
    ) -> Result<WriteTextFileResult, JsonRpcError> {
        Err(JsonRpcError::method_not_found(methods::FS_WRITE_TEXT_FILE))
    }

    /// `session/update`; called inline by the reader loop, in arrival order
    async fn session_notification(&self, _notification: SessionNotification) {}
}

/// Handler that accepts nothing: permissions are cancelled, file access is
/// unsupported and updates are dropped
#[derive(Debug, Default, Clone, Copy)]
pub struct NullClientHandler;

impl ClientHandler for NullClientHandler {}
