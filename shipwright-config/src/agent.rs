use crate::constants::defaults;
use serde::{Deserialize, Serialize};

fn default_command() -> String {
    defaults::AGENT_COMMAND.to_string()
}

fn default_args() -> Vec<String> {
    defaults::AGENT_ARGS.iter().map(ToString::to_string).collect()
}

fn default_max_frame_bytes() -> usize {
    defaults::MAX_FRAME_BYTES
}

/// `[agent]` section: how to launch the ACP coding agent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AgentProcessConfig {
    /// Executable to spawn
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments enabling ACP mode and auto-confirmation in the agent
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Frames larger than this are dropped
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for AgentProcessConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}
