//! Pipe-based process spawning with merged, line-oriented output.
//!
//! stdout and stderr are each pumped by their own task into one channel, so
//! the consumer sees a single stream of lines in the order they were read.
//! The stream ends once both pipes close; the exit status is collected
//! separately with [`LineStreamProcess::wait`].

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::status::CommandStatus;
use crate::stream::LineReader;

/// Default per-line ceiling for child output.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// A single line of child output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub source: OutputSource,
    pub text: String,
}

/// Options for spawning a pipe-based process.
#[derive(Debug, Clone)]
pub struct PipeSpawnOptions {
    /// The program to execute.
    pub program: String,
    /// Arguments to pass to the program.
    pub args: Vec<String>,
    /// Working directory for the process.
    pub cwd: PathBuf,
    /// Per-line byte ceiling.
    pub max_line_bytes: usize,
}

impl PipeSpawnOptions {
    /// Create new spawn options with default settings.
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Add arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Human-readable command line for logs and error messages.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A running child whose merged output is consumed line by line.
pub struct LineStreamProcess {
    child: Child,
    lines: mpsc::UnboundedReceiver<OutputLine>,
    command: String,
}

impl LineStreamProcess {
    /// Next output line, or `None` once both pipes have closed.
    pub async fn next_line(&mut self) -> Option<OutputLine> {
        self.lines.recv().await
    }

    /// Wait for the child to exit. Call after the line stream has ended.
    pub async fn wait(mut self) -> Result<CommandStatus> {
        let status = self
            .child
            .wait()
            .await
            .with_context(|| format!("failed to wait for `{}`", self.command))?;
        debug!(command = %self.command, code = ?status.code(), "process exited");
        Ok(CommandStatus::from(status))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

fn pump<R>(
    reader: R,
    source: OutputSource,
    max_line_bytes: usize,
    tx: mpsc::UnboundedSender<OutputLine>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = LineReader::new(BufReader::new(reader), max_line_bytes);
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.truncated {
                        debug!(?source, "truncated oversized output line");
                    }
                    let item = OutputLine {
                        source,
                        text: line.text,
                    };
                    if tx.send(item).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(?source, %error, "failed to read child output");
                    break;
                }
            }
        }
    });
}

/// Spawn `opts.program` with stdin closed and stdout/stderr merged into a
/// single line stream.
pub fn spawn_line_stream(opts: &PipeSpawnOptions) -> Result<LineStreamProcess> {
    if opts.program.is_empty() {
        anyhow::bail!("missing program for pipe spawn");
    }

    let command_line = opts.display_command();
    let mut command = Command::new(&opts.program);
    command
        .args(&opts.args)
        .current_dir(&opts.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to spawn `{command_line}`"))?;

    let (tx, rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        pump(stdout, OutputSource::Stdout, opts.max_line_bytes, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        pump(stderr, OutputSource::Stderr, opts.max_line_bytes, tx);
    }

    debug!(command = %command_line, cwd = %opts.cwd.display(), pid = ?child.id(), "spawned process");

    Ok(LineStreamProcess {
        child,
        lines: rx,
        command: command_line,
    })
}
