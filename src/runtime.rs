//! Lifetime of the agent process and its connection
//!
//! An [`AgentRuntime`] is created once, handed to every workflow run, and
//! shut down explicitly. Dropping it also kills the agent process.

use std::sync::Arc;

use anyhow::{Context, Result};
use shipwright_acp_client::{
    AcpConnection, AgentCommand, ClientCapabilities, ProcessTransport, Transport,
};
use shipwright_commons::{ErrorReporter, TracingErrorReporter};
use shipwright_config::AgentProcessConfig;
use tracing::info;

use crate::acp::WorkflowClient;
use crate::orchestrator::{ImageBuilder, NotificationQueue, WorkflowSequencer, WorkflowSettings};

pub struct AgentRuntime {
    connection: Arc<AcpConnection>,
    queue: Arc<NotificationQueue>,
}

impl AgentRuntime {
    /// Spawn the configured agent and complete the handshake
    pub async fn launch(config: &AgentProcessConfig) -> Result<Self> {
        let command = AgentCommand::new(&config.command)
            .args(config.args.iter().cloned())
            .max_frame_bytes(config.max_frame_bytes);
        let transport = ProcessTransport::spawn(&command)
            .with_context(|| format!("failed to start agent `{}`", config.command))?;

        Self::connect(Arc::new(transport), Arc::new(TracingErrorReporter)).await
    }

    /// Handshake over an existing transport
    pub async fn connect(
        transport: Arc<dyn Transport>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self> {
        let queue = Arc::new(NotificationQueue::new());
        let client = WorkflowClient::new(queue.sender()).with_reporter(reporter);
        let connection = Arc::new(AcpConnection::start(transport, Arc::new(client)));

        let agent = connection
            .initialize(ClientCapabilities::with_text_files())
            .await
            .context("ACP handshake with the agent failed")?;
        info!(
            protocol = agent.protocol_version,
            load_session = agent.agent_capabilities.load_session,
            "Agent ready"
        );

        Ok(Self { connection, queue })
    }

    pub fn connection(&self) -> &Arc<AcpConnection> {
        &self.connection
    }

    pub fn queue(&self) -> &Arc<NotificationQueue> {
        &self.queue
    }

    /// Sequencer bound to this runtime's connection and queue
    pub fn sequencer(
        &self,
        settings: WorkflowSettings,
        builder: Arc<dyn ImageBuilder>,
    ) -> WorkflowSequencer {
        WorkflowSequencer::new(
            Arc::clone(&self.connection),
            Arc::clone(&self.queue),
            builder,
            settings,
        )
    }

    /// Stop the reader and terminate the agent process
    pub async fn shutdown(&self) -> Result<()> {
        self.connection
            .shutdown()
            .await
            .context("failed to stop the agent")?;
        info!("Agent stopped");
        Ok(())
    }
}
