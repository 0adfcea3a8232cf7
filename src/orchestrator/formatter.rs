//! Human-readable rendering of session updates

use shipwright_acp_client::{SessionUpdate, ToolCallStatus};

/// Text shown for an update, or `None` when it is not worth showing
pub fn format_update(update: &SessionUpdate) -> Option<String> {
    match update {
        SessionUpdate::AgentMessageChunk { content } => content.as_text().map(str::to_string),
        SessionUpdate::AgentThoughtChunk { content } => {
            content.as_text().map(|text| format!("[Thought] {text}"))
        }
        SessionUpdate::ToolCall { title, .. } => Some(format!("[Tool] {title}")),
        SessionUpdate::ToolCallUpdate {
            status: Some(ToolCallStatus::Completed),
            ..
        } => Some("[Tool] Completed".to_string()),
        SessionUpdate::ToolCallUpdate { .. } | SessionUpdate::Unrecognized => None,
    }
}
