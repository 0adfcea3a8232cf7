use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use shipwright_config::ShipwrightConfig;

/// Run a coding agent through the task, Dockerfile and documentation steps,
/// then build the project's container image
#[derive(Debug, Parser)]
#[command(name = "shipwright", version, about)]
pub struct Cli {
    /// Configuration file (default: ./shipwright.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory projects live under
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Project subdirectory below the root; also names the image
    #[arg(long, value_name = "SUBPATH")]
    pub directory: Option<String>,

    /// Registry/organisation prefix for the image tag
    #[arg(long = "docker-repo", value_name = "REPO")]
    pub docker_repo: Option<String>,

    /// Skip the image build
    #[arg(long)]
    pub no_build: bool,

    /// Task for the agent; read from stdin when omitted
    #[arg(value_name = "PROMPT", trailing_var_arg = true)]
    pub prompt: Vec<String>,
}

impl Cli {
    /// Layer command-line flags over the loaded configuration
    pub fn apply_overrides(&self, config: &mut ShipwrightConfig) {
        if let Some(root) = &self.root {
            config.workspace.root_dir = root.clone();
        }
        if let Some(directory) = &self.directory {
            config.workspace.directory = directory.clone();
        }
        if let Some(repo) = &self.docker_repo {
            config.image.repository = repo.clone();
        }
        if self.no_build {
            config.image.enabled = false;
        }
    }

    /// Prompt from the arguments, or from piped stdin
    pub fn prompt_text(&self) -> Result<String> {
        if !self.prompt.is_empty() {
            return Ok(self.prompt.join(" "));
        }

        let mut stdin = io::stdin();
        if stdin.is_terminal() {
            bail!("No prompt provided. Pass it as arguments or pipe it via stdin.");
        }
        let mut buffer = String::new();
        stdin
            .read_to_string(&mut buffer)
            .context("Failed to read prompt from stdin")?;
        if buffer.trim().is_empty() {
            bail!("No prompt provided on stdin.");
        }
        Ok(buffer)
    }
}
