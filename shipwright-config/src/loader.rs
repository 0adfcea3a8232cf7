use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::AgentProcessConfig;
use crate::constants::defaults;
use crate::constants::env::ShipwrightEnvKey;
use crate::debug::DebugConfig;
use crate::image::ImageConfig;
use crate::workflow::WorkflowConfig;
use crate::workspace::WorkspaceConfig;

/// Accepts 1/true/yes/on and 0/false/no/off, case-insensitively
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_value(key: ShipwrightEnvKey) -> Option<String> {
    std::env::var(key.as_str())
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Contents of `shipwright.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ShipwrightConfig {
    #[serde(default)]
    pub agent: AgentProcessConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

impl ShipwrightConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.agent.command.trim().is_empty(),
            "agent.command must not be empty"
        );
        ensure!(
            self.agent.max_frame_bytes > 0,
            "agent.max_frame_bytes must be greater than zero"
        );
        ensure!(
            !self.image.builder.trim().is_empty(),
            "image.builder must not be empty"
        );
        ensure!(
            !self.workflow.author.trim().is_empty(),
            "workflow.author must not be empty"
        );
        Ok(())
    }

    /// Layer `SHIPWRIGHT_*` variables over the loaded values
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env_value);
    }

    /// Same as [`Self::apply_env_overrides`] with an explicit lookup
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(ShipwrightEnvKey) -> Option<String>) {
        if let Some(root) = lookup(ShipwrightEnvKey::RootDir) {
            self.workspace.root_dir = PathBuf::from(root);
        }
        if let Some(repository) = lookup(ShipwrightEnvKey::DockerRepo) {
            self.image.repository = repository;
        }
        if let Some(command) = lookup(ShipwrightEnvKey::AgentCommand) {
            self.agent.command = command;
        }
        if let Some(raw) = lookup(ShipwrightEnvKey::BuildEnabled) {
            match parse_bool(&raw) {
                Some(enabled) => self.image.enabled = enabled,
                None => tracing::warn!(
                    key = ShipwrightEnvKey::BuildEnabled.as_str(),
                    value = %raw,
                    "Ignoring unparseable boolean"
                ),
            }
        }
    }
}

/// Loads and validates configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ShipwrightConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load from `SHIPWRIGHT_CONFIG_PATH` when set, else from the current
    /// directory
    pub fn load() -> Result<Self> {
        if let Some(config_path) = env_value(ShipwrightEnvKey::ConfigPath) {
            return Self::load_from_file(&config_path).with_context(|| {
                format!(
                    "Failed to load configuration from {}={}",
                    ShipwrightEnvKey::ConfigPath.as_str(),
                    config_path
                )
            });
        }

        Self::load_from_workspace(std::env::current_dir()?)
    }

    /// Load `shipwright.toml` from `workspace`, falling back to defaults when
    /// the file does not exist
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        let config_path = workspace.as_ref().join(defaults::CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::load_from_file(config_path);
        }

        debug!(
            workspace = %workspace.as_ref().display(),
            "No configuration file found; using defaults"
        );
        let mut config = ShipwrightConfig::default();
        config.apply_env_overrides();
        config
            .validate()
            .context("Default configuration failed validation")?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: ShipwrightConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides();
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        debug!(path = %path.display(), "Loaded configuration");
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    pub fn config(&self) -> &ShipwrightConfig {
        &self.config
    }

    pub fn into_config(self) -> ShipwrightConfig {
        self.config
    }

    /// File the configuration came from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
