//! Workflow sequencer
//!
//! One run per user request:
//! `Idle -> SessionStarting -> RunningStep(0..n) -> Draining -> BuildingImage -> Done`,
//! with `ErrorTerminal` reachable from every state.
//!
//! While a prompt turn is outstanding the sequencer waits on whichever comes
//! first, the next queued notification or the end of the turn, always taking
//! buffered notifications first. When the turn ends everything still buffered
//! is emitted before the next step starts, so events keep the agent's order.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use shipwright_acp_client::{
    AcpConnection, ContentBlock, SessionNotification, SessionPromptResult,
};
use shipwright_commons::{ChainErrorFormatter, ErrorFormatter, resolve_project_dir};
use shipwright_config::ShipwrightConfig;
use tracing::{debug, error, info};

use super::events::EventSink;
use super::formatter::format_update;
use super::image::{BuildResult, ImageBuilder, derive_image_tag};
use super::queue::{NotificationQueue, QueueConsumer};
use super::steps::{WorkflowStep, default_plan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    SessionStarting,
    RunningStep(usize),
    Draining,
    BuildingImage,
    Done,
    ErrorTerminal,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::SessionStarting => f.write_str("session-starting"),
            Self::RunningStep(index) => write!(f, "running-step-{index}"),
            Self::Draining => f.write_str("draining"),
            Self::BuildingImage => f.write_str("building-image"),
            Self::Done => f.write_str("done"),
            Self::ErrorTerminal => f.write_str("error"),
        }
    }
}

/// Static inputs shared by every run
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Absolute directory projects live under
    pub root_dir: PathBuf,
    /// Default project subdirectory when a request names none
    pub directory: Option<String>,
    pub repository: Option<String>,
    pub build_enabled: bool,
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowSettings {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::from_parts(root_dir.into(), &ShipwrightConfig::default())
    }

    pub fn from_config(config: &ShipwrightConfig) -> Result<Self> {
        Ok(Self::from_parts(config.workspace.absolute_root()?, config))
    }

    fn from_parts(root_dir: PathBuf, config: &ShipwrightConfig) -> Self {
        Self {
            root_dir,
            directory: config.workspace.directory().map(str::to_string),
            repository: config.image.repository().map(str::to_string),
            build_enabled: config.image.enabled,
            steps: default_plan(&config.workflow),
        }
    }
}

/// One incoming user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRequest {
    pub text: String,
    /// Overrides [`WorkflowSettings::directory`]
    pub directory: Option<String>,
}

impl WorkflowRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            directory: None,
        }
    }

    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    /// `Done` or `ErrorTerminal`
    pub state: WorkflowState,
    pub session_id: Option<String>,
    pub build: Option<BuildResult>,
}

impl WorkflowOutcome {
    pub fn is_done(&self) -> bool {
        self.state == WorkflowState::Done
    }
}

/// Mutable bookkeeping for one run
struct Run {
    state: WorkflowState,
    session_id: Option<String>,
    build: Option<BuildResult>,
}

impl Run {
    fn transition(&mut self, next: WorkflowState) {
        debug!(from = %self.state, to = %next, "Workflow state change");
        self.state = next;
    }
}

pub struct WorkflowSequencer {
    connection: Arc<AcpConnection>,
    queue: Arc<NotificationQueue>,
    builder: Arc<dyn ImageBuilder>,
    settings: WorkflowSettings,
}

impl WorkflowSequencer {
    pub fn new(
        connection: Arc<AcpConnection>,
        queue: Arc<NotificationQueue>,
        builder: Arc<dyn ImageBuilder>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            connection,
            queue,
            builder,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Run every step for `request`, emitting progress into `events`
    ///
    /// Never fails: a fault ends the run in `ErrorTerminal` after a single
    /// `Error: ...` event.
    pub async fn run(&self, request: WorkflowRequest, events: &EventSink) -> WorkflowOutcome {
        let mut consumer = self.queue.consumer().await;
        consumer.discard_stale();

        let mut run = Run {
            state: WorkflowState::Idle,
            session_id: None,
            build: None,
        };

        match self.drive(&request, events, &mut consumer, &mut run).await {
            Ok(()) => run.transition(WorkflowState::Done),
            Err(fault) => {
                error!(state = %run.state, error = %format!("{fault:#}"), "Workflow failed");
                if matches!(run.state, WorkflowState::RunningStep(_))
                    && let Some(session_id) = &run.session_id
                    && let Err(cancel_error) = self.connection.cancel(session_id).await
                {
                    debug!(error = %cancel_error, "Cancel after failure was not delivered");
                }
                events.emit(format!("Error: {}", ChainErrorFormatter.format_error(&fault)));
                run.transition(WorkflowState::ErrorTerminal);
            }
        }

        if let Some(session_id) = &run.session_id {
            self.connection.close_session(session_id);
        }

        WorkflowOutcome {
            state: run.state,
            session_id: run.session_id,
            build: run.build,
        }
    }

    async fn drive(
        &self,
        request: &WorkflowRequest,
        events: &EventSink,
        consumer: &mut QueueConsumer,
        run: &mut Run,
    ) -> Result<()> {
        let user_text = request.text.trim();
        if user_text.is_empty() {
            bail!("no prompt text was provided");
        }

        run.transition(WorkflowState::SessionStarting);
        let directory = request
            .directory
            .as_deref()
            .or(self.settings.directory.as_deref());
        let project = resolve_project_dir(&self.settings.root_dir, directory)?;
        let cwd = &project.path;
        tokio::fs::create_dir_all(cwd)
            .await
            .with_context(|| format!("failed to create project directory {}", cwd.display()))?;

        let session = self
            .connection
            .new_session(cwd)
            .await
            .context("failed to start agent session")?;
        let session_id = session.session_id;
        run.session_id = Some(session_id.clone());
        info!(session_id = %session_id, cwd = %cwd.display(), "Agent session started");

        for (index, step) in self.settings.steps.iter().enumerate() {
            run.transition(WorkflowState::RunningStep(index));
            let result = self
                .run_step(&session_id, step.render(&request.text), consumer, events)
                .await
                .with_context(|| format!("{} step failed", step.label))?;
            debug!(
                session_id = %session_id,
                step = %step.label,
                stop_reason = ?result.stop_reason,
                "Workflow step finished"
            );
        }

        run.transition(WorkflowState::Draining);
        self.drain_buffered(&session_id, consumer, events);

        let tag = derive_image_tag(self.settings.repository.as_deref(), &project.subpath);
        match tag {
            Some(tag) if self.settings.build_enabled => {
                run.transition(WorkflowState::BuildingImage);
                run.build = Some(self.builder.build(&tag, cwd, events).await);
            }
            Some(tag) => debug!(tag = %tag, "Image build disabled"),
            None => debug!("No project directory; skipping image build"),
        }
        Ok(())
    }

    /// One prompt turn with notifications drained around it
    async fn run_step(
        &self,
        session_id: &str,
        text: &str,
        consumer: &mut QueueConsumer,
        events: &EventSink,
    ) -> Result<SessionPromptResult> {
        let turn = self
            .connection
            .prompt(session_id, vec![ContentBlock::text(text)]);
        tokio::pin!(turn);

        let result = loop {
            tokio::select! {
                biased;
                Some(notification) = consumer.recv() => {
                    self.emit_update(session_id, notification, events);
                }
                result = &mut turn => break result,
            }
        };

        self.drain_buffered(session_id, consumer, events);
        Ok(result?)
    }

    fn drain_buffered(&self, session_id: &str, consumer: &mut QueueConsumer, events: &EventSink) {
        for notification in consumer.drain() {
            self.emit_update(session_id, notification, events);
        }
    }

    fn emit_update(&self, session_id: &str, notification: SessionNotification, events: &EventSink) {
        if notification.session_id != session_id {
            debug!(
                expected = session_id,
                got = %notification.session_id,
                "Ignoring update for another session"
            );
            return;
        }
        if let Some(text) = format_update(&notification.update).filter(|text| !text.is_empty()) {
            events.emit(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = ShipwrightConfig::default();
        config.workspace.root_dir = PathBuf::from("/srv/work");
        config.workspace.directory = "app1".into();
        config.image.repository = "registry/org".into();
        config.image.enabled = false;

        let settings = WorkflowSettings::from_config(&config).unwrap();
        assert_eq!(settings.root_dir, PathBuf::from("/srv/work"));
        assert_eq!(settings.directory.as_deref(), Some("app1"));
        assert_eq!(settings.repository.as_deref(), Some("registry/org"));
        assert!(!settings.build_enabled);
        assert_eq!(settings.steps.len(), 3);
    }

    #[test]
    fn states_render_for_logs() {
        assert_eq!(WorkflowState::RunningStep(2).to_string(), "running-step-2");
        assert_eq!(WorkflowState::ErrorTerminal.to_string(), "error");
    }
}
