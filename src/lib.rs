//! shipwright: drives an ACP coding agent through a fixed workflow
//!
//! For each request the agent is prompted with the user's task, then asked to
//! create or update a Dockerfile, then to update the project documentation.
//! Afterwards the project's container image is built. Agent output and build
//! output come back as one ordered stream of [`orchestrator::AgentEvent`]s.
//!
//! - [`acp`] answers the agent's permission and file callbacks
//! - [`orchestrator`] sequences the prompts and the build
//! - [`runtime`] owns the agent process
//!
//! The wire protocol itself lives in `shipwright-acp-client`.

pub mod acp;
pub mod cli;
pub mod orchestrator;
pub mod runtime;
pub mod startup;

pub use orchestrator::{
    AgentEvent, EventSink, WorkflowOutcome, WorkflowRequest, WorkflowSequencer, WorkflowSettings,
    WorkflowState,
};
pub use runtime::AgentRuntime;
