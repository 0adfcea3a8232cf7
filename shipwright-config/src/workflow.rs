use crate::constants::defaults;
use serde::{Deserialize, Serialize};

fn default_author() -> String {
    defaults::EVENT_AUTHOR.to_string()
}

fn default_dockerfile_prompt() -> String {
    defaults::DOCKERFILE_PROMPT.to_string()
}

fn default_documentation_prompt() -> String {
    defaults::DOCUMENTATION_PROMPT.to_string()
}

/// `[workflow]` section: fixed prompt texts and event attribution
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Author attached to every emitted event
    #[serde(default = "default_author")]
    pub author: String,

    /// Second step, sent after the user's prompt
    #[serde(default = "default_dockerfile_prompt")]
    pub dockerfile_prompt: String,

    /// Third step
    #[serde(default = "default_documentation_prompt")]
    pub documentation_prompt: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            author: default_author(),
            dockerfile_prompt: default_dockerfile_prompt(),
            documentation_prompt: default_documentation_prompt(),
        }
    }
}
