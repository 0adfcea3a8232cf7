//! Process bootstrap: configuration and tracing

use std::path::PathBuf;

use anyhow::{Context, Result};
use shipwright_config::{ConfigManager, DebugConfig, ShipwrightConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Effective settings for this invocation
#[derive(Debug, Clone)]
pub struct StartupContext {
    pub config: ShipwrightConfig,
    pub config_path: Option<PathBuf>,
}

impl StartupContext {
    /// Load the configuration file, then apply environment and flags
    pub fn from_cli_args(args: &Cli) -> Result<Self> {
        let manager = match &args.config {
            Some(path) => ConfigManager::load_from_file(path)?,
            None => ConfigManager::load()?,
        };
        let config_path = manager.config_path().map(PathBuf::from);

        let mut config = manager.into_config();
        args.apply_overrides(&mut config);
        config
            .validate()
            .context("Configuration is invalid after applying command-line flags")?;

        Ok(Self {
            config,
            config_path,
        })
    }
}

/// Install the global subscriber; `RUST_LOG` wins over `[debug]`
///
/// Logs go to stderr so stdout only carries workflow events.
pub fn initialize_tracing(debug: &DebugConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(debug.filter_directives()));

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();

    if let Err(err) = init_result {
        tracing::warn!(error = %err, "tracing already initialized; skipping setup");
    }
}
