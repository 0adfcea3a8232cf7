//! The prompt sequence sent for every request, as data

use shipwright_config::WorkflowConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPrompt {
    /// The caller's text, verbatim
    UserInput,
    Fixed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStep {
    /// Short name used in logs and error messages
    pub label: String,
    pub prompt: StepPrompt,
}

impl WorkflowStep {
    pub fn user_input(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            prompt: StepPrompt::UserInput,
        }
    }

    pub fn fixed(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            prompt: StepPrompt::Fixed(text.into()),
        }
    }

    /// Prompt text for this step given the caller's input
    pub fn render<'a>(&'a self, user_text: &'a str) -> &'a str {
        match &self.prompt {
            StepPrompt::UserInput => user_text,
            StepPrompt::Fixed(text) => text,
        }
    }
}

/// User task, then Dockerfile update, then documentation update
pub fn default_plan(config: &WorkflowConfig) -> Vec<WorkflowStep> {
    vec![
        WorkflowStep::user_input("task"),
        WorkflowStep::fixed("dockerfile", config.dockerfile_prompt.clone()),
        WorkflowStep::fixed("documentation", config.documentation_prompt.clone()),
    ]
}
