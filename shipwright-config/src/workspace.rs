use crate::constants::defaults;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_root_dir() -> PathBuf {
    PathBuf::from(defaults::ROOT_DIR)
}

/// `[workspace]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Directory every project lives under
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Project subdirectory below `root_dir`; empty means the root itself.
    /// Also names the built image.
    #[serde(default)]
    pub directory: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            directory: String::new(),
        }
    }
}

impl WorkspaceConfig {
    /// `root_dir` made absolute against the current directory
    pub fn absolute_root(&self) -> Result<PathBuf> {
        std::path::absolute(&self.root_dir).with_context(|| {
            format!(
                "Failed to resolve workspace root {}",
                self.root_dir.display()
            )
        })
    }

    /// Subdirectory, or `None` when unset
    pub fn directory(&self) -> Option<&str> {
        let trimmed = self.directory.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
