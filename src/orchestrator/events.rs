use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

/// One line of output for the host, attributed to an author
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentEvent {
    pub author: String,
    pub text: String,
}

/// Producer side of the event stream
#[derive(Debug, Clone)]
pub struct EventSink {
    author: Arc<str>,
    tx: mpsc::UnboundedSender<AgentEvent>,
}

impl EventSink {
    pub fn channel(author: impl Into<Arc<str>>) -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                author: author.into(),
                tx,
            },
            rx,
        )
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Emit one event; `false` when the host stopped listening
    pub fn emit(&self, text: impl Into<String>) -> bool {
        self.tx
            .send(AgentEvent {
                author: self.author.to_string(),
                text: text.into(),
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_carry_the_author() {
        let (sink, mut rx) = EventSink::channel("coding");
        assert!(sink.emit("hello"));
        assert_eq!(
            rx.try_recv().unwrap(),
            AgentEvent {
                author: "coding".into(),
                text: "hello".into()
            }
        );

        drop(rx);
        assert!(!sink.emit("nobody listening"));
    }
}
