//! Newline-delimited JSON transport
//!
//! A [`Transport`] moves whole frames (one JSON object per line) between the
//! client and an agent. [`StdioTransport`] works over any async byte stream
//! pair; [`ProcessTransport`] owns the agent child process and wires its
//! stdin/stdout into a [`StdioTransport`].

use crate::error::{AcpError, AcpResult};
use async_trait::async_trait;
use shipwright_process_runner::LineReader;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Default frame ceiling (10 MiB); agents can send large file contents
///
/// A longer line is not parsed. The transport yields its first bytes as
/// [`InboundFrame::Oversized`] and the connection fails the pending request
/// whose id appears there before the result. A response that puts its `id`
/// after a huge `result` cannot be matched and leaves its caller waiting
/// until the agent exits.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

/// One line read from the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A complete frame
    Message(String),
    /// A line cut at the frame limit; `head` holds the bytes kept
    Oversized { head: String },
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Frame-level I/O with the agent
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one frame. Fails with [`AcpError::TransportClosed`] once the
    /// peer is gone.
    async fn send(&self, frame: &str) -> AcpResult<()>;

    /// Next inbound frame; `None` once the stream has ended. Ending is not an
    /// error: callers detect unexpected termination through their own
    /// outstanding requests.
    async fn receive(&self) -> Option<InboundFrame>;

    /// Release the underlying resources
    async fn close(&self) -> AcpResult<()>;
}

/// Transport over an arbitrary reader/writer pair
pub struct StdioTransport {
    writer: Mutex<Option<BoxedWriter>>,
    reader: Mutex<LineReader<BufReader<BoxedReader>>>,
}

impl StdioTransport {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_max_frame_bytes(reader, writer, DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_max_frame_bytes<R, W>(reader: R, writer: W, max_frame_bytes: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: BoxedReader = Box::new(reader);
        let writer: BoxedWriter = Box::new(writer);
        Self {
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(LineReader::new(BufReader::new(reader), max_frame_bytes)),
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&self, frame: &str) -> AcpResult<()> {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(AcpError::transport_closed("agent input stream is closed"));
        };

        trace!(bytes = frame.len(), "writing frame");
        let written = async {
            writer.write_all(frame.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(error) = written {
            *guard = None;
            return Err(AcpError::transport_closed(format!(
                "failed to write to agent: {error}"
            )));
        }
        Ok(())
    }

    async fn receive(&self) -> Option<InboundFrame> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next_line().await {
                Ok(Some(line)) if line.truncated => {
                    debug!(kept = line.text.len(), "agent frame exceeded the size limit");
                    return Some(InboundFrame::Oversized { head: line.text });
                }
                Ok(Some(line)) => {
                    if line.text.trim().is_empty() {
                        continue;
                    }
                    trace!(bytes = line.text.len(), "read frame");
                    return Some(InboundFrame::Message(line.text));
                }
                Ok(None) => return None,
                Err(error) => {
                    warn!(%error, "agent output stream failed");
                    return None;
                }
            }
        }
    }

    async fn close(&self) -> AcpResult<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(error) = writer.shutdown().await {
                debug!(%error, "agent input stream already closed");
            }
        }
        Ok(())
    }
}

/// How to launch the agent process
#[derive(Debug, Clone)]
pub struct AgentCommand {
    pub program: String,
    pub args: Vec<String>,
    pub max_frame_bytes: usize,
}

impl AgentCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }
}

/// Transport bound to a spawned agent process
///
/// stderr is discarded; the child is killed when the transport is closed or
/// dropped.
pub struct ProcessTransport {
    inner: StdioTransport,
    child: Mutex<Child>,
    program: String,
}

impl ProcessTransport {
    pub fn spawn(command: &AgentCommand) -> AcpResult<Self> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AcpError::transport_closed("agent stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AcpError::transport_closed("agent stdout unavailable"))?;

        info!(
            program = %command.program,
            args = ?command.args,
            pid = ?child.id(),
            "spawned ACP agent process"
        );

        Ok(Self {
            inner: StdioTransport::with_max_frame_bytes(stdout, stdin, command.max_frame_bytes),
            child: Mutex::new(child),
            program: command.program.clone(),
        })
    }

    /// Whether the agent process is still running
    pub async fn is_running(&self) -> bool {
        matches!(self.child.lock().await.try_wait(), Ok(None))
    }
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn send(&self, frame: &str) -> AcpResult<()> {
        if !self.is_running().await {
            return Err(AcpError::transport_closed(format!(
                "agent process `{}` is not running",
                self.program
            )));
        }
        self.inner.send(frame).await
    }

    async fn receive(&self) -> Option<InboundFrame> {
        self.inner.receive().await
    }

    async fn close(&self) -> AcpResult<()> {
        self.inner.close().await?;
        let mut child = self.child.lock().await;
        if matches!(child.try_wait(), Ok(None)) {
            child.start_kill()?;
        }
        let status = child.wait().await?;
        info!(program = %self.program, code = ?status.code(), "ACP agent process stopped");
        Ok(())
    }
}
