//! ACP session types and lifecycle management
//!
//! This module implements the session surface used by the client:
//! - Session creation (session/new)
//! - Prompt handling (session/prompt, session/cancel)
//! - Agent callbacks (session/request_permission, fs/read_text_file, fs/write_text_file)
//! - Session updates (session/update notifications)
//!
//! Reference: https://agentclientprotocol.com/llms.txt

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Method names used on the wire
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const SESSION_NEW: &str = "session/new";
    pub const SESSION_PROMPT: &str = "session/prompt";
    pub const SESSION_CANCEL: &str = "session/cancel";
    pub const SESSION_UPDATE: &str = "session/update";
    pub const SESSION_REQUEST_PERMISSION: &str = "session/request_permission";
    pub const FS_READ_TEXT_FILE: &str = "fs/read_text_file";
    pub const FS_WRITE_TEXT_FILE: &str = "fs/write_text_file";
}

/// Session state enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Session created but no prompt sent yet
    #[default]
    Created,
    /// A prompt turn is in flight
    Active,
    /// Last turn finished; waiting for the next prompt
    AwaitingInput,
    /// Session was cancelled
    Cancelled,
    /// A turn failed
    Failed,
}

/// Locally tracked view of a session opened on the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcpSession {
    /// Opaque identifier issued by the agent
    pub session_id: String,

    /// Absolute working directory the session was opened for
    pub cwd: PathBuf,

    /// Current session state
    pub state: SessionState,

    /// Session creation timestamp (ISO 8601)
    pub created_at: String,

    /// Last activity timestamp (ISO 8601)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<String>,

    /// Number of prompt turns started
    #[serde(default)]
    pub turn_count: u32,
}

impl AcpSession {
    pub fn new(session_id: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            cwd: cwd.into(),
            state: SessionState::Created,
            created_at: chrono::Utc::now().to_rfc3339(),
            last_activity_at: None,
            turn_count: 0,
        }
    }

    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.last_activity_at = Some(chrono::Utc::now().to_rfc3339());
    }

    pub fn increment_turn(&mut self) {
        self.turn_count += 1;
        self.last_activity_at = Some(chrono::Utc::now().to_rfc3339());
    }
}

// ============================================================================
// Session/New Request/Response
// ============================================================================

/// Parameters for session/new method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNewParams {
    /// Absolute working directory for the session
    pub cwd: PathBuf,

    /// MCP servers the agent should connect to (always empty here)
    #[serde(default)]
    pub mcp_servers: Vec<Value>,
}

impl SessionNewParams {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            mcp_servers: Vec::new(),
        }
    }
}

/// Result of session/new method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNewResult {
    pub session_id: String,
}

// ============================================================================
// Session/Prompt Request/Response
// ============================================================================

/// Content block carried by prompts and message chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content
    Text { text: String },

    /// Images, audio, resources and anything newer
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Unsupported => None,
        }
    }
}

/// Parameters for session/prompt method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPromptParams {
    pub session_id: String,
    pub prompt: Vec<ContentBlock>,
}

impl SessionPromptParams {
    /// Prompt made of a single text block
    pub fn text(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            prompt: vec![ContentBlock::text(text)],
        }
    }
}

/// Why the agent ended a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    MaxTurnRequests,
    Refusal,
    Cancelled,
    #[serde(other)]
    Other,
}

/// Result of session/prompt method; its arrival is the turn completion signal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

/// Parameters for the session/cancel notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCancelParams {
    pub session_id: String,
}

// ============================================================================
// Session/RequestPermission (Client Method)
// ============================================================================

/// Kind attached to each permission option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOptionKind {
    AllowOnce,
    AllowAlways,
    RejectOnce,
    RejectAlways,
    #[serde(other)]
    Other,
}

impl PermissionOptionKind {
    pub fn is_allow(self) -> bool {
        matches!(self, Self::AllowOnce | Self::AllowAlways)
    }
}

/// A permission option presented by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOption {
    pub option_id: String,

    /// Display label
    #[serde(default)]
    pub name: String,

    pub kind: PermissionOptionKind,
}

impl PermissionOption {
    pub fn new(
        option_id: impl Into<String>,
        name: impl Into<String>,
        kind: PermissionOptionKind,
    ) -> Self {
        Self {
            option_id: option_id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Parameters for session/request_permission (called by the agent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPermissionParams {
    #[serde(default)]
    pub session_id: String,

    /// Tool call the agent wants to run; kept opaque
    #[serde(default)]
    pub tool_call: Value,

    /// Options in the order the agent listed them
    pub options: Vec<PermissionOption>,
}

/// Outcome of a permission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestPermissionOutcome {
    /// An option was chosen
    Selected {
        #[serde(rename = "optionId")]
        option_id: String,
    },
    /// The request was cancelled; the agent treats this as a denial
    Cancelled,
}

/// Result of session/request_permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPermissionResult {
    pub outcome: RequestPermissionOutcome,
}

impl RequestPermissionResult {
    pub fn selected(option_id: impl Into<String>) -> Self {
        Self {
            outcome: RequestPermissionOutcome::Selected {
                option_id: option_id.into(),
            },
        }
    }

    pub fn cancelled() -> Self {
        Self {
            outcome: RequestPermissionOutcome::Cancelled,
        }
    }
}

// ============================================================================
// fs/read_text_file and fs/write_text_file (Client Methods)
// ============================================================================

/// Parameters for fs/read_text_file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadTextFileParams {
    #[serde(default)]
    pub session_id: String,

    pub path: PathBuf,

    /// 1-based first line to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// Maximum number of lines to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ReadTextFileParams {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            session_id: String::new(),
            path: path.as_ref().to_path_buf(),
            line: None,
            limit: None,
        }
    }
}

/// Result of fs/read_text_file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadTextFileResult {
    pub content: String,
}

/// Parameters for fs/write_text_file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteTextFileParams {
    #[serde(default)]
    pub session_id: String,

    pub path: PathBuf,

    pub content: String,
}

impl WriteTextFileParams {
    pub fn new(path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        Self {
            session_id: String::new(),
            path: path.as_ref().to_path_buf(),
            content: content.into(),
        }
    }
}

/// Result of fs/write_text_file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteTextFileResult {}

// ============================================================================
// Session/Update Notification (Streaming)
// ============================================================================

/// Session update notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNotification {
    pub session_id: String,
    pub update: SessionUpdate,
}

/// Tool call lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    #[serde(other)]
    Other,
}

/// Session update variants the client understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sessionUpdate", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// Streamed chunk of the agent's reply
    AgentMessageChunk { content: ContentBlock },

    /// Streamed chunk of the agent's reasoning
    AgentThoughtChunk { content: ContentBlock },

    /// A tool call started
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        #[serde(default)]
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<ToolCallStatus>,
    },

    /// Progress on an earlier tool call
    #[serde(rename_all = "camelCase")]
    ToolCallUpdate {
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<ToolCallStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// Plans, user message echoes, mode changes and future variants
    #[serde(other)]
    Unrecognized,
}
