use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use shipwright_acp_client::{
    AcpConnection, AcpError, ClientCapabilities, ClientHandler, ContentBlock, JsonRpcError,
    NullClientHandler, RequestPermissionParams, RequestPermissionResult, SessionNotification,
    SessionState, SessionUpdate, StdioTransport, StopReason, error_codes,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf, duplex,
};

/// Scripted agent on the far side of an in-memory pipe
struct FakeAgent {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeAgent {
    async fn recv(&mut self) -> Value {
        let line = self
            .lines
            .next_line()
            .await
            .expect("read from client")
            .expect("client closed the stream");
        serde_json::from_str(&line).expect("client sent valid JSON")
    }

    async fn send(&mut self, frame: Value) {
        let mut text = serde_json::to_string(&frame).unwrap();
        text.push('\n');
        self.writer.write_all(text.as_bytes()).await.unwrap();
    }

    async fn respond(&mut self, id: &Value, result: Value) {
        self.send(json!({"jsonrpc": "2.0", "id": id, "result": result}))
            .await;
    }

    /// Answer the next request, which must be `initialize`
    async fn accept_initialize(&mut self, version: u16) {
        let request = self.recv().await;
        assert_eq!(request["method"], "initialize");
        self.respond(
            &request["id"],
            json!({"protocolVersion": version, "agentCapabilities": {"loadSession": false}}),
        )
        .await;
    }
}

fn connect(handler: Arc<dyn ClientHandler>) -> (AcpConnection, FakeAgent) {
    let (client_io, agent_io) = duplex(64 * 1024);
    let (client_read, client_write) = tokio::io::split(client_io);
    let (agent_read, agent_write) = tokio::io::split(agent_io);

    let transport = StdioTransport::new(client_read, client_write);
    let connection = AcpConnection::start(Arc::new(transport), handler);
    let agent = FakeAgent {
        lines: BufReader::new(agent_read).lines(),
        writer: agent_write,
    };
    (connection, agent)
}

async fn initialized(handler: Arc<dyn ClientHandler>) -> (AcpConnection, FakeAgent) {
    let (connection, mut agent) = connect(handler);
    let (result, ()) = tokio::join!(
        connection.initialize(ClientCapabilities::with_text_files()),
        agent.accept_initialize(1)
    );
    result.expect("handshake succeeds");
    (connection, agent)
}

#[derive(Default)]
struct RecordingHandler {
    updates: Mutex<Vec<SessionUpdate>>,
    permissions: Mutex<Vec<RequestPermissionParams>>,
}

#[async_trait]
impl ClientHandler for RecordingHandler {
    async fn request_permission(
        &self,
        params: RequestPermissionParams,
    ) -> Result<RequestPermissionResult, JsonRpcError> {
        let first = params.options.first().map(|option| option.option_id.clone());
        self.permissions.lock().unwrap().push(params);
        Ok(first.map_or_else(RequestPermissionResult::cancelled, RequestPermissionResult::selected))
    }

    async fn session_notification(&self, notification: SessionNotification) {
        self.updates.lock().unwrap().push(notification.update);
    }
}

#[tokio::test]
async fn initialize_advertises_text_file_capabilities() {
    let (connection, mut agent) = connect(Arc::new(NullClientHandler));

    let handshake = tokio::spawn(async move {
        let request = agent.recv().await;
        agent
            .respond(&request["id"], json!({"protocolVersion": 1}))
            .await;
        (request, agent)
    });

    let result = connection
        .initialize(ClientCapabilities::with_text_files())
        .await
        .unwrap();
    let (request, _agent) = handshake.await.unwrap();

    assert_eq!(result.protocol_version, 1);
    assert!(connection.is_initialized());
    assert_eq!(connection.protocol_version(), Some(1));
    assert_eq!(request["jsonrpc"], "2.0");
    assert_eq!(request["params"]["protocolVersion"], 1);
    assert_eq!(
        request["params"]["clientCapabilities"]["fs"],
        json!({"readTextFile": true, "writeTextFile": true})
    );
}

#[tokio::test]
async fn second_initialize_reuses_the_handshake() {
    let (connection, _agent) = initialized(Arc::new(NullClientHandler)).await;
    let again = connection
        .initialize(ClientCapabilities::default())
        .await
        .unwrap();
    assert_eq!(again.protocol_version, 1);
    assert_eq!(connection.pending_requests(), 0);
}

#[tokio::test]
async fn protocol_mismatch_is_reported() {
    let (connection, mut agent) = connect(Arc::new(NullClientHandler));
    let (result, ()) = tokio::join!(
        connection.initialize(ClientCapabilities::with_text_files()),
        agent.accept_initialize(2)
    );

    match result {
        Err(AcpError::ProtocolMismatch { expected, actual }) => {
            assert_eq!((expected, actual), (1, 2));
        }
        other => panic!("expected protocol mismatch, got {other:?}"),
    }
    assert!(!connection.is_initialized());
}

#[tokio::test]
async fn requests_before_initialize_are_rejected() {
    let (connection, _agent) = connect(Arc::new(NullClientHandler));
    let err = connection.new_session(Path::new("/tmp")).await.unwrap_err();
    assert!(matches!(err, AcpError::NotInitialized));
}

#[tokio::test]
async fn new_session_tracks_the_session() {
    let (connection, mut agent) = initialized(Arc::new(NullClientHandler)).await;

    let respond = async {
        let request = agent.recv().await;
        assert_eq!(request["method"], "session/new");
        assert_eq!(request["params"]["cwd"], "/work/app1");
        assert_eq!(request["params"]["mcpServers"], json!([]));
        agent
            .respond(&request["id"], json!({"sessionId": "sess-1"}))
            .await;
    };
    let (session, ()) = tokio::join!(connection.new_session(Path::new("/work/app1")), respond);

    let session = session.unwrap();
    assert_eq!(session.session_id, "sess-1");
    assert_eq!(session.state, SessionState::Created);
    assert!(connection.session("sess-1").is_some());
}

#[tokio::test]
async fn closed_sessions_are_forgotten() {
    let (connection, mut agent) = initialized(Arc::new(NullClientHandler)).await;

    for id in ["sess-1", "sess-2"] {
        let respond = async {
            let request = agent.recv().await;
            agent.respond(&request["id"], json!({"sessionId": id})).await;
        };
        let (session, ()) = tokio::join!(connection.new_session(Path::new("/work")), respond);
        session.unwrap();
    }

    let closed = connection.close_session("sess-1").unwrap();
    assert_eq!(closed.session_id, "sess-1");
    assert!(connection.session("sess-1").is_none());
    assert!(connection.session("sess-2").is_some());
    assert!(connection.close_session("sess-1").is_none());
}

#[tokio::test]
async fn session_refusal_becomes_creation_failure() {
    let (connection, mut agent) = initialized(Arc::new(NullClientHandler)).await;

    let refuse = async {
        let request = agent.recv().await;
        agent
            .send(json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": -32000, "message": "authentication required"}
            }))
            .await;
    };
    let (result, ()) = tokio::join!(connection.new_session(Path::new("/work")), refuse);

    match result {
        Err(AcpError::SessionCreationFailed { cwd, message }) => {
            assert_eq!(cwd, Path::new("/work"));
            assert_eq!(message, "authentication required");
        }
        other => panic!("expected session creation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn responses_are_matched_by_id_not_order() {
    let (connection, mut agent) = initialized(Arc::new(NullClientHandler)).await;

    let answer_backwards = async {
        let first = agent.recv().await;
        let second = agent.recv().await;
        let stop_for = |request: &Value| {
            if request["params"]["sessionId"] == "a" {
                "end_turn"
            } else {
                "max_tokens"
            }
        };
        agent
            .respond(&second["id"], json!({"stopReason": stop_for(&second)}))
            .await;
        agent
            .respond(&first["id"], json!({"stopReason": stop_for(&first)}))
            .await;
    };

    let (a, b, ()) = tokio::join!(
        connection.prompt("a", vec![ContentBlock::text("one")]),
        connection.prompt("b", vec![ContentBlock::text("two")]),
        answer_backwards
    );

    assert_eq!(a.unwrap().stop_reason, Some(StopReason::EndTurn));
    assert_eq!(b.unwrap().stop_reason, Some(StopReason::MaxTokens));
    assert_eq!(connection.pending_requests(), 0);
}

#[tokio::test]
async fn notifications_arrive_in_order_before_the_turn_ends() {
    let handler = Arc::new(RecordingHandler::default());
    let (connection, mut agent) = initialized(handler.clone()).await;

    let script = async {
        let request = agent.recv().await;
        for text in ["Hel", "lo"] {
            agent
                .send(json!({
                    "jsonrpc": "2.0",
                    "method": "session/update",
                    "params": {
                        "sessionId": "s",
                        "update": {
                            "sessionUpdate": "agent_message_chunk",
                            "content": {"type": "text", "text": text}
                        }
                    }
                }))
                .await;
        }
        agent
            .send(json!({
                "jsonrpc": "2.0",
                "method": "session/update",
                "params": {"sessionId": "s", "update": {"sessionUpdate": "plan", "entries": []}}
            }))
            .await;
        agent
            .respond(&request["id"], json!({"stopReason": "end_turn"}))
            .await;
    };
    let (result, ()) = tokio::join!(
        connection.prompt("s", vec![ContentBlock::text("hi")]),
        script
    );
    result.unwrap();

    let updates = handler.updates.lock().unwrap().clone();
    assert_eq!(
        updates,
        vec![
            SessionUpdate::AgentMessageChunk {
                content: ContentBlock::text("Hel")
            },
            SessionUpdate::AgentMessageChunk {
                content: ContentBlock::text("lo")
            },
            SessionUpdate::Unrecognized,
        ]
    );
}

#[tokio::test]
async fn permission_requests_are_answered_through_the_handler() {
    let handler = Arc::new(RecordingHandler::default());
    let (_connection, mut agent) = initialized(handler.clone()).await;

    agent
        .send(json!({
            "jsonrpc": "2.0",
            "id": "perm-1",
            "method": "session/request_permission",
            "params": {
                "sessionId": "s",
                "toolCall": {"toolCallId": "t1"},
                "options": [
                    {"optionId": "yes", "name": "Allow", "kind": "allow_once"},
                    {"optionId": "no", "name": "Reject", "kind": "reject_once"}
                ]
            }
        }))
        .await;

    let response = agent.recv().await;
    assert_eq!(response["id"], "perm-1");
    assert_eq!(
        response["result"],
        json!({"outcome": {"outcome": "selected", "optionId": "yes"}})
    );
    assert_eq!(handler.permissions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_methods_and_bad_params_get_errors() {
    let (_connection, mut agent) = initialized(Arc::new(NullClientHandler)).await;

    agent
        .send(json!({"jsonrpc": "2.0", "id": 7, "method": "terminal/create", "params": {}}))
        .await;
    let response = agent.recv().await;
    assert_eq!(response["id"], 7);
    assert_eq!(response["error"]["code"], error_codes::METHOD_NOT_FOUND);

    agent
        .send(json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "session/request_permission",
            "params": {"options": "not a list"}
        }))
        .await;
    let response = agent.recv().await;
    assert_eq!(response["id"], 8);
    assert_eq!(response["error"]["code"], error_codes::INVALID_PARAMS);
}

#[tokio::test]
async fn null_handler_declines_file_access() {
    let (_connection, mut agent) = initialized(Arc::new(NullClientHandler)).await;

    agent
        .send(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "fs/read_text_file",
            "params": {"sessionId": "s", "path": "/etc/hostname"}
        }))
        .await;
    let response = agent.recv().await;
    assert_eq!(response["error"]["code"], error_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn cancel_is_a_notification() {
    let (connection, mut agent) = initialized(Arc::new(NullClientHandler)).await;

    connection.cancel("sess-9").await.unwrap();
    let frame = agent.recv().await;
    assert_eq!(frame["method"], "session/cancel");
    assert_eq!(frame["params"]["sessionId"], "sess-9");
    assert!(frame.get("id").is_none());
}

#[tokio::test]
async fn oversized_response_fails_its_request() {
    let (client_io, agent_io) = duplex(64 * 1024);
    let (client_read, client_write) = tokio::io::split(client_io);
    let (agent_read, agent_write) = tokio::io::split(agent_io);
    let transport = StdioTransport::with_max_frame_bytes(client_read, client_write, 256);
    let connection = AcpConnection::start(Arc::new(transport), Arc::new(NullClientHandler));
    let mut agent = FakeAgent {
        lines: BufReader::new(agent_read).lines(),
        writer: agent_write,
    };

    let (result, ()) = tokio::join!(
        connection.initialize(ClientCapabilities::with_text_files()),
        agent.accept_initialize(1)
    );
    result.unwrap();

    let oversized = async {
        let request = agent.recv().await;
        assert_eq!(request["method"], "session/prompt");
        agent
            .respond(
                &request["id"],
                json!({"stopReason": "end_turn", "text": "x".repeat(1024)}),
            )
            .await;
    };
    let (first, ()) = tokio::join!(
        connection.prompt("s", vec![ContentBlock::text("big")]),
        oversized
    );
    match first {
        Err(AcpError::FrameTooLarge { method }) => assert_eq!(method, "session/prompt"),
        other => panic!("expected an oversized frame failure, got {other:?}"),
    }

    let normal = async {
        let request = agent.recv().await;
        agent
            .respond(&request["id"], json!({"stopReason": "end_turn"}))
            .await;
    };
    let (second, ()) = tokio::join!(
        connection.prompt("s", vec![ContentBlock::text("small")]),
        normal
    );
    assert_eq!(second.unwrap().stop_reason, Some(StopReason::EndTurn));
    assert!(!connection.is_closed());
    assert_eq!(connection.pending_requests(), 0);
}

#[tokio::test]
async fn agent_exit_fails_outstanding_requests() {
    let (connection, mut agent) = initialized(Arc::new(NullClientHandler)).await;

    let vanish = async move {
        let request = agent.recv().await;
        assert_eq!(request["method"], "session/prompt");
        drop(agent);
    };
    let (result, ()) = tokio::join!(
        connection.prompt("s", vec![ContentBlock::text("hi")]),
        vanish
    );

    assert!(result.unwrap_err().is_transport_closed());
    assert!(connection.is_closed());
    assert_eq!(connection.pending_requests(), 0);
}
