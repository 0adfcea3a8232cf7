//! Container image build after the prompt steps
//!
//! The build tool's stdout and stderr are streamed into the event stream as
//! they arrive, each line prefixed with `[Docker] `. Failing to build, or even
//! to start the tool, is reported through events and never returned as an
//! error.

use std::path::{Component, Path};

use async_trait::async_trait;
use shipwright_process_runner::{DEFAULT_MAX_LINE_BYTES, PipeSpawnOptions, spawn_line_stream};
use thiserror::Error;
use tracing::{info, warn};

use super::events::EventSink;

/// `repository/subpath`, `subpath` alone, or nothing when the project is the
/// workspace root
///
/// `subpath` is the validated project subdirectory; its components are joined
/// with `/` whatever the host separator.
pub fn derive_image_tag(repository: Option<&str>, subpath: &Path) -> Option<String> {
    let name = subpath
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    if name.is_empty() {
        return None;
    }
    match repository.map(str::trim).filter(|repo| !repo.is_empty()) {
        Some(repo) => Some(format!("{}/{name}", repo.trim_end_matches('/'))),
        None => Some(name),
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to launch `{command}`: {message}")]
    LaunchFailed { command: String, message: String },
}

/// What a build produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub image_tag: Option<String>,
    /// Non-empty output lines, trimmed, without the event prefix
    pub lines: Vec<String>,
    /// `None` when the tool never ran or was killed by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
}

#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Build `tag` from `context_dir`, streaming progress into `events`
    async fn build(&self, tag: &str, context_dir: &Path, events: &EventSink) -> BuildResult;
}

/// Runs `<program> build -t <tag> .` in the project directory
#[derive(Debug, Clone)]
pub struct DockerBuildStreamer {
    program: String,
    max_line_bytes: usize,
}

impl Default for DockerBuildStreamer {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerBuildStreamer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    pub fn command(&self, tag: &str, context_dir: &Path) -> PipeSpawnOptions {
        PipeSpawnOptions::new(&self.program, context_dir)
            .args(["build", "-t", tag, "."])
            .max_line_bytes(self.max_line_bytes)
    }
}

#[async_trait]
impl ImageBuilder for DockerBuildStreamer {
    async fn build(&self, tag: &str, context_dir: &Path, events: &EventSink) -> BuildResult {
        let mut result = BuildResult {
            image_tag: Some(tag.to_string()),
            ..BuildResult::default()
        };
        events.emit(format!("[Docker] Building image: {tag}"));

        let options = self.command(tag, context_dir);
        let mut process = match spawn_line_stream(&options) {
            Ok(process) => process,
            Err(error) => {
                let error = BuildError::LaunchFailed {
                    command: options.display_command(),
                    message: format!("{error:#}"),
                };
                warn!(%error, "Image build could not start");
                events.emit(format!("[Docker] Error building image: {error}"));
                return result;
            }
        };
        info!(tag = tag, dir = %context_dir.display(), pid = ?process.id(), "Image build started");

        while let Some(line) = process.next_line().await {
            let text = line.text.trim();
            if text.is_empty() {
                continue;
            }
            events.emit(format!("[Docker] {text}"));
            result.lines.push(text.to_string());
        }

        match process.wait().await {
            Ok(status) => {
                result.exit_code = status.code();
                result.success = status.success();
                let summary = match (status.success(), status.code()) {
                    (true, _) => format!("[Docker] Successfully built image: {tag}"),
                    (false, Some(code)) => format!("[Docker] Build failed with exit code: {code}"),
                    (false, None) => "[Docker] Build terminated by signal".to_string(),
                };
                info!(tag = tag, code = ?status.code(), "Image build finished");
                events.emit(summary);
            }
            Err(error) => {
                warn!(error = %format!("{error:#}"), "Image build status unavailable");
                events.emit(format!("[Docker] Error building image: {error:#}"));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shipwright_commons::resolve_project_dir;

    fn tag(repository: Option<&str>, directory: &str) -> Option<String> {
        let project = resolve_project_dir(Path::new("/work"), Some(directory)).unwrap();
        derive_image_tag(repository, &project.subpath)
    }

    #[test]
    fn tag_joins_repository_and_directory() {
        assert_eq!(
            tag(Some("registry/org"), "app1").as_deref(),
            Some("registry/org/app1")
        );
        assert_eq!(
            tag(Some("registry/org/"), "app1").as_deref(),
            Some("registry/org/app1")
        );
    }

    #[test]
    fn tag_without_repository_is_directory() {
        assert_eq!(tag(None, "app1").as_deref(), Some("app1"));
        assert_eq!(tag(Some(""), "app1").as_deref(), Some("app1"));
    }

    #[test]
    fn no_directory_means_no_tag() {
        assert_eq!(tag(Some("registry/org"), ""), None);
        assert_eq!(derive_image_tag(Some("registry/org"), Path::new("")), None);
    }

    #[test]
    fn tag_follows_the_normalized_directory() {
        assert_eq!(tag(Some("registry/org"), "./"), None);
        assert_eq!(tag(Some("registry/org"), "."), None);
        assert_eq!(
            tag(Some("registry/org"), "app1/").as_deref(),
            Some("registry/org/app1")
        );
        assert_eq!(
            tag(Some("registry/org"), "apps/./app1").as_deref(),
            Some("registry/org/apps/app1")
        );
    }

    #[test]
    fn docker_command_line() {
        let command = DockerBuildStreamer::default().command("app1", Path::new("/work/app1"));
        assert_eq!(command.display_command(), "docker build -t app1 .");
        assert_eq!(command.cwd, Path::new("/work/app1"));
    }

    #[tokio::test]
    async fn launch_failure_is_one_error_event() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, mut rx) = EventSink::channel("coding");
        let builder = DockerBuildStreamer::new("/definitely/missing/docker");

        let result = builder.build("app1", dir.path(), &sink).await;
        drop(sink);

        let mut texts = Vec::new();
        while let Some(event) = rx.recv().await {
            texts.push(event.text);
        }
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], "[Docker] Building image: app1");
        assert!(texts[1].starts_with("[Docker] Error building image: "));
        assert!(!result.success);
        assert_eq!(result.exit_code, None);
    }
}
