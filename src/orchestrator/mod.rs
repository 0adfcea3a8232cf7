//! Prompt workflow, event stream and image build

pub mod events;
pub mod formatter;
pub mod image;
pub mod queue;
pub mod steps;
pub mod workflow;

pub use events::{AgentEvent, EventSink};
pub use formatter::format_update;
pub use image::{BuildError, BuildResult, DockerBuildStreamer, ImageBuilder, derive_image_tag};
pub use queue::{NotificationQueue, NotificationSender, QueueConsumer};
pub use steps::{StepPrompt, WorkflowStep, default_plan};
pub use workflow::{
    WorkflowOutcome, WorkflowRequest, WorkflowSequencer, WorkflowSettings, WorkflowState,
};
