//! ACP capabilities and initialization types
//!
//! This module implements the capability negotiation performed by the
//! `initialize` handshake:
//! - Protocol version negotiation
//! - Client capability advertisement (filesystem access)
//! - Agent capability discovery
//!
//! Reference: https://agentclientprotocol.com/llms.txt

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// ACP protocol version spoken by this client
pub const PROTOCOL_VERSION: u16 = 1;

// ============================================================================
// Initialize Request/Response
// ============================================================================

/// Parameters for the initialize method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version the client speaks
    pub protocol_version: u16,

    /// Client capabilities
    pub client_capabilities: ClientCapabilities,
}

impl InitializeParams {
    pub fn new(client_capabilities: ClientCapabilities) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            client_capabilities,
        }
    }
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self::new(ClientCapabilities::default())
    }
}

/// Result of the initialize method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version chosen by the agent
    pub protocol_version: u16,

    /// Agent capabilities
    #[serde(default)]
    pub agent_capabilities: AgentCapabilities,

    /// Authentication methods the agent offers (unused: no auth is performed)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth_methods: Vec<Value>,
}

// ============================================================================
// Client Capabilities
// ============================================================================

/// Capabilities the client advertises to the agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    /// File system operations served by the client
    #[serde(default)]
    pub fs: FileSystemCapability,

    /// Whether the client can host terminals for the agent
    #[serde(default)]
    pub terminal: bool,
}

impl ClientCapabilities {
    /// Capabilities for a client that serves both text file callbacks
    pub fn with_text_files() -> Self {
        Self {
            fs: FileSystemCapability {
                read_text_file: true,
                write_text_file: true,
            },
            terminal: false,
        }
    }
}

/// File system operation capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemCapability {
    /// Agent may call `fs/read_text_file`
    #[serde(default)]
    pub read_text_file: bool,

    /// Agent may call `fs/write_text_file`
    #[serde(default)]
    pub write_text_file: bool,
}

// ============================================================================
// Agent Capabilities
// ============================================================================

/// Capabilities the agent reports back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Agent supports `session/load`
    #[serde(default)]
    pub load_session: bool,

    /// Content types accepted in prompts
    #[serde(default)]
    pub prompt_capabilities: PromptCapabilities,

    /// Anything else the agent advertises
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

/// Prompt content capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptCapabilities {
    #[serde(default)]
    pub image: bool,

    #[serde(default)]
    pub audio: bool,

    #[serde(default)]
    pub embedded_context: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initialize_params_wire_shape() {
        let params = InitializeParams::new(ClientCapabilities::with_text_files());
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            json!({
                "protocolVersion": 1,
                "clientCapabilities": {
                    "fs": {"readTextFile": true, "writeTextFile": true},
                    "terminal": false
                }
            })
        );
    }

    #[test]
    fn test_initialize_result_tolerates_sparse_agent() {
        let result: InitializeResult = serde_json::from_value(json!({
            "protocolVersion": 1,
            "agentCapabilities": {"loadSession": true, "mcpCapabilities": {"http": false}}
        }))
        .unwrap();

        assert_eq!(result.protocol_version, PROTOCOL_VERSION);
        assert!(result.agent_capabilities.load_session);
        assert!(!result.agent_capabilities.prompt_capabilities.image);
        assert!(
            result
                .agent_capabilities
                .extensions
                .contains_key("mcpCapabilities")
        );
    }
}
