//! Scripted ACP agent and helpers shared by the workflow tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use shipwright::AgentRuntime;
use shipwright::orchestrator::{BuildResult, EventSink, ImageBuilder};
use shipwright_acp_client::StdioTransport;
use shipwright_commons::MemoryErrorReporter;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf, duplex,
};

/// Agent side of an in-memory pipe
pub struct FakeAgent {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

/// A `session/prompt` as the agent received it
#[derive(Debug, Clone)]
pub struct ReceivedPrompt {
    pub id: Value,
    pub session_id: String,
    pub text: String,
}

impl FakeAgent {
    pub async fn recv(&mut self) -> Value {
        let line = self
            .lines
            .next_line()
            .await
            .expect("read from client")
            .expect("client closed the stream");
        serde_json::from_str(&line).expect("client sent valid JSON")
    }

    /// `None` when the client stays silent for `wait`
    pub async fn recv_within(&mut self, wait: Duration) -> Option<Value> {
        tokio::time::timeout(wait, self.recv()).await.ok()
    }

    pub async fn send(&mut self, frame: Value) {
        let mut text = serde_json::to_string(&frame).unwrap();
        text.push('\n');
        self.writer.write_all(text.as_bytes()).await.unwrap();
    }

    pub async fn respond(&mut self, id: &Value, result: Value) {
        self.send(json!({"jsonrpc": "2.0", "id": id, "result": result}))
            .await;
    }

    pub async fn respond_error(&mut self, id: &Value, code: i32, message: &str) {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }))
        .await;
    }

    pub async fn accept_initialize(&mut self) {
        let request = self.recv().await;
        assert_eq!(request["method"], "initialize");
        self.respond(&request["id"], json!({"protocolVersion": 1}))
            .await;
    }

    /// Answer `session/new` with `session_id`; returns the requested cwd
    pub async fn accept_session(&mut self, session_id: &str) -> String {
        let request = self.recv().await;
        assert_eq!(request["method"], "session/new");
        let cwd = request["params"]["cwd"]
            .as_str()
            .expect("cwd is a string")
            .to_string();
        self.respond(&request["id"], json!({"sessionId": session_id}))
            .await;
        cwd
    }

    pub async fn expect_prompt(&mut self) -> ReceivedPrompt {
        let request = self.recv().await;
        assert_eq!(request["method"], "session/prompt", "got {request}");
        ReceivedPrompt {
            id: request["id"].clone(),
            session_id: request["params"]["sessionId"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            text: request["params"]["prompt"][0]["text"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub async fn end_turn(&mut self, prompt: &ReceivedPrompt) {
        self.respond(&prompt.id, json!({"stopReason": "end_turn"}))
            .await;
    }

    pub async fn say(&mut self, session_id: &str, text: &str) {
        self.send(json!({
            "jsonrpc": "2.0",
            "method": "session/update",
            "params": {
                "sessionId": session_id,
                "update": {
                    "sessionUpdate": "agent_message_chunk",
                    "content": {"type": "text", "text": text}
                }
            }
        }))
        .await;
    }
}

/// Runtime wired to a [`FakeAgent`], handshake already done
pub async fn start_runtime() -> (AgentRuntime, FakeAgent, Arc<MemoryErrorReporter>) {
    let (client_io, agent_io) = duplex(64 * 1024);
    let (client_read, client_write) = tokio::io::split(client_io);
    let (agent_read, agent_write) = tokio::io::split(agent_io);
    let mut agent = FakeAgent {
        lines: BufReader::new(agent_read).lines(),
        writer: agent_write,
    };

    let reporter = Arc::new(MemoryErrorReporter::new());
    let transport = Arc::new(StdioTransport::new(client_read, client_write));
    let (runtime, ()) = tokio::join!(
        AgentRuntime::connect(transport, reporter.clone()),
        agent.accept_initialize()
    );
    (runtime.expect("handshake succeeds"), agent, reporter)
}

/// Records build requests instead of running a container tool
#[derive(Default)]
pub struct RecordingBuilder {
    pub calls: Mutex<Vec<(String, std::path::PathBuf)>>,
}

impl RecordingBuilder {
    pub fn calls(&self) -> Vec<(String, std::path::PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageBuilder for RecordingBuilder {
    async fn build(&self, tag: &str, context_dir: &Path, events: &EventSink) -> BuildResult {
        self.calls
            .lock()
            .unwrap()
            .push((tag.to_string(), context_dir.to_path_buf()));
        events.emit(format!("[Docker] Successfully built image: {tag}"));
        BuildResult {
            image_tag: Some(tag.to_string()),
            lines: Vec::new(),
            exit_code: Some(0),
            success: true,
        }
    }
}

/// Every event text emitted so far
pub fn collect_texts(
    receiver: &mut tokio::sync::mpsc::UnboundedReceiver<shipwright::AgentEvent>,
) -> Vec<String> {
    let mut texts = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        texts.push(event.text);
    }
    texts
}
