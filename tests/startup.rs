use std::path::PathBuf;

use anyhow::Result;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use clap::Parser;
use pretty_assertions::assert_eq;
use shipwright::WorkflowSettings;
use shipwright::cli::Cli;
use shipwright::startup::StartupContext;

#[test]
fn flags_win_over_the_config_file() -> Result<()> {
    let dir = TempDir::new()?;
    let file = dir.child("custom.toml");
    file.write_str(
        r#"
[workspace]
root_dir = "/srv/projects"
directory = "from-file"

[image]
repository = "file/repo"
builder = "podman"
"#,
    )?;

    let cli = Cli::parse_from([
        "shipwright",
        "--config",
        file.path().to_str().unwrap(),
        "--docker-repo",
        "cli/repo",
        "--no-build",
        "task",
    ]);
    let startup = StartupContext::from_cli_args(&cli)?;
    let config = &startup.config;

    assert_eq!(startup.config_path.as_deref(), Some(file.path()));
    assert_eq!(config.workspace.root_dir, PathBuf::from("/srv/projects"));
    assert_eq!(config.workspace.directory(), Some("from-file"));
    assert_eq!(config.image.repository(), Some("cli/repo"));
    assert_eq!(config.image.builder, "podman");
    assert!(!config.image.enabled);

    let settings = WorkflowSettings::from_config(config)?;
    assert_eq!(settings.root_dir, PathBuf::from("/srv/projects"));
    assert_eq!(settings.directory.as_deref(), Some("from-file"));
    assert!(!settings.build_enabled);
    Ok(())
}

#[test]
fn missing_config_file_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let missing = dir.child("absent.toml");

    let cli = Cli::parse_from([
        "shipwright",
        "--config",
        missing.path().to_str().unwrap(),
        "task",
    ]);
    let error = StartupContext::from_cli_args(&cli).unwrap_err();
    assert!(format!("{error:#}").contains("Failed to read config file"));
    Ok(())
}
