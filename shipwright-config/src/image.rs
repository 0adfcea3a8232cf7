use crate::constants::defaults;
use serde::{Deserialize, Serialize};

fn default_builder() -> String {
    defaults::IMAGE_BUILDER.to_string()
}

fn default_enabled() -> bool {
    true
}

/// `[image]` section: the container build that follows the prompt steps
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Registry/organisation prefix for the tag, e.g. `registry.example.com/team`
    #[serde(default)]
    pub repository: String,

    /// Build tool invoked as `<builder> build -t <tag> .`
    #[serde(default = "default_builder")]
    pub builder: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            builder: default_builder(),
            enabled: default_enabled(),
        }
    }
}

impl ImageConfig {
    pub fn repository(&self) -> Option<&str> {
        let trimmed = self.repository.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
