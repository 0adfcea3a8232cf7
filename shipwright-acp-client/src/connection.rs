//! Bidirectional ACP connection
//!
//! [`AcpConnection`] is both a JSON-RPC client (it sends `initialize`,
//! `session/new`, `session/prompt`) and a server (it answers the agent's
//! permission and file callbacks). A single reader task owns the inbound side
//! of the transport and dispatches every frame:
//! - responses resolve the pending request with the same id,
//! - agent requests run on their own task and are answered through the
//!   registered [`ClientHandler`],
//! - notifications are delivered to the handler inline, in arrival order.
//!
//! Requests are matched to responses only by id, so any number of them may be
//! outstanding at once.

use crate::capabilities::{ClientCapabilities, InitializeParams, InitializeResult, PROTOCOL_VERSION};
use crate::error::{AcpError, AcpResult};
use crate::handler::ClientHandler;
use crate::jsonrpc::{IncomingMessage, JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse};
use crate::session::{
    AcpSession, ContentBlock, SessionCancelParams, SessionNewParams, SessionNewResult,
    SessionNotification, SessionPromptParams, SessionPromptResult, SessionState, StopReason,
    methods,
};
use crate::transport::{InboundFrame, Transport};

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{OnceCell, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// What the reader loop hands to a waiting request
#[derive(Debug)]
enum Reply {
    Response(Result<Value, JsonRpcError>),
    /// The response exceeded the frame limit and was discarded
    Oversized,
}

type ResponseSender = oneshot::Sender<Reply>;

/// Outstanding requests keyed by id
#[derive(Default)]
struct PendingRequests {
    state: Mutex<PendingState>,
}

#[derive(Default)]
struct PendingState {
    slots: HashMap<u64, ResponseSender>,
    closed: Option<String>,
}

impl PendingRequests {
    fn register(&self, id: u64) -> AcpResult<oneshot::Receiver<Reply>> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.closed {
            return Err(AcpError::transport_closed(reason.clone()));
        }
        let (tx, rx) = oneshot::channel();
        state.slots.insert(id, tx);
        Ok(rx)
    }

    fn take(&self, id: u64) -> Option<ResponseSender> {
        self.state.lock().slots.remove(&id)
    }

    fn remove(&self, id: u64) {
        self.state.lock().slots.remove(&id);
    }

    fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Fail every outstanding request; dropping the senders wakes the waiters
    fn close(&self, reason: &str) -> usize {
        let mut state = self.state.lock();
        state.closed = Some(reason.to_string());
        let failed = state.slots.len();
        state.slots.clear();
        failed
    }

    fn closed_reason(&self) -> Option<String> {
        self.state.lock().closed.clone()
    }
}

/// Removes the pending slot when the awaiting future finishes or is dropped
struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.id);
    }
}

/// Client side of an ACP connection
pub struct AcpConnection {
    transport: Arc<dyn Transport>,
    pending: Arc<PendingRequests>,
    request_counter: AtomicU64,
    initialized: OnceCell<InitializeResult>,
    sessions: RwLock<HashMap<String, AcpSession>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl AcpConnection {
    /// Start the reader loop over `transport`, dispatching agent callbacks to
    /// `handler`. Must be called from within a tokio runtime.
    pub fn start(transport: Arc<dyn Transport>, handler: Arc<dyn ClientHandler>) -> Self {
        let pending = Arc::new(PendingRequests::default());
        let reader = tokio::spawn(read_loop(
            Arc::clone(&transport),
            Arc::clone(&pending),
            handler,
        ));

        Self {
            transport,
            pending,
            request_counter: AtomicU64::new(1),
            initialized: OnceCell::new(),
            sessions: RwLock::new(HashMap::new()),
            reader: Mutex::new(Some(reader)),
        }
    }

    fn next_request_id(&self) -> u64 {
        self.request_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Negotiated protocol version (after initialize)
    pub fn protocol_version(&self) -> Option<u16> {
        self.initialized.get().map(|result| result.protocol_version)
    }

    /// Whether the inbound stream has ended
    pub fn is_closed(&self) -> bool {
        self.pending.closed_reason().is_some()
    }

    /// Number of requests still awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    // ========================================================================
    // JSON-RPC Transport Layer
    // ========================================================================

    /// Send a JSON-RPC request and wait for its response
    async fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: &P) -> AcpResult<R> {
        let id = self.next_request_id();
        let params_value = serde_json::to_value(params)?;
        let frame = serde_json::to_string(&JsonRpcRequest::new(
            JsonRpcId::from(id),
            method,
            Some(params_value),
        ))?;

        let response_rx = self.pending.register(id)?;
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        debug!(method = method, id = id, "Sending JSON-RPC request");
        self.transport.send(&frame).await?;

        let reply = response_rx.await.map_err(|_| {
            AcpError::transport_closed(
                self.pending
                    .closed_reason()
                    .unwrap_or_else(|| format!("connection dropped while awaiting {method}")),
            )
        })?;
        let response = match reply {
            Reply::Response(response) => response,
            Reply::Oversized => {
                return Err(AcpError::FrameTooLarge {
                    method: method.to_string(),
                });
            }
        };

        let result = response.map_err(|error| AcpError::Remote {
            method: method.to_string(),
            error,
        })?;
        trace!(method = method, id = id, "Received JSON-RPC response");
        Ok(serde_json::from_value(result)?)
    }

    /// Send a notification (no response expected)
    async fn notify<P: Serialize>(&self, method: &str, params: &P) -> AcpResult<()> {
        let params_value = serde_json::to_value(params)?;
        let frame = serde_json::to_string(&JsonRpcRequest::notification(method, Some(params_value)))?;
        debug!(method = method, "Sending JSON-RPC notification");
        self.transport.send(&frame).await
    }

    fn ensure_initialized(&self) -> AcpResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(AcpError::NotInitialized)
        }
    }

    // ========================================================================
    // ACP Protocol Methods
    // ========================================================================

    /// Perform the `initialize` handshake
    ///
    /// The handshake runs at most once; later calls return the stored result.
    /// Fails with [`AcpError::ProtocolMismatch`] when the agent answers with a
    /// protocol version other than [`PROTOCOL_VERSION`].
    pub async fn initialize(&self, capabilities: ClientCapabilities) -> AcpResult<InitializeResult> {
        let result = self
            .initialized
            .get_or_try_init(|| async move {
                let params = InitializeParams::new(capabilities);
                let result: InitializeResult = self.call(methods::INITIALIZE, &params).await?;
                if result.protocol_version != PROTOCOL_VERSION {
                    return Err(AcpError::ProtocolMismatch {
                        expected: PROTOCOL_VERSION,
                        actual: result.protocol_version,
                    });
                }
                info!(
                    protocol = result.protocol_version,
                    load_session = result.agent_capabilities.load_session,
                    "ACP connection initialized"
                );
                Ok(result)
            })
            .await?;
        Ok(result.clone())
    }

    /// Open a new session rooted at `cwd`
    pub async fn new_session(&self, cwd: &Path) -> AcpResult<AcpSession> {
        self.ensure_initialized()?;

        let params = SessionNewParams::new(cwd);
        let result: SessionNewResult = match self.call(methods::SESSION_NEW, &params).await {
            Ok(result) => result,
            Err(AcpError::Remote { error, .. }) => {
                return Err(AcpError::SessionCreationFailed {
                    cwd: cwd.to_path_buf(),
                    message: error.message,
                });
            }
            Err(other) => return Err(other),
        };

        let session = AcpSession::new(&result.session_id, cwd);
        self.sessions
            .write()
            .insert(result.session_id.clone(), session.clone());

        debug!(session_id = %result.session_id, cwd = %cwd.display(), "Session created");
        Ok(session)
    }

    /// Send one prompt turn; resolves when the agent reports the turn finished
    ///
    /// Notifications produced during the turn are delivered to the handler
    /// before this resolves, but may still be queued on the consumer side.
    pub async fn prompt(
        &self,
        session_id: &str,
        content: Vec<ContentBlock>,
    ) -> AcpResult<SessionPromptResult> {
        self.ensure_initialized()?;

        if let Some(session) = self.sessions.write().get_mut(session_id) {
            session.set_state(SessionState::Active);
            session.increment_turn();
        }

        let params = SessionPromptParams {
            session_id: session_id.to_string(),
            prompt: content,
        };
        let outcome: AcpResult<SessionPromptResult> =
            self.call(methods::SESSION_PROMPT, &params).await;

        if let Some(session) = self.sessions.write().get_mut(session_id) {
            match &outcome {
                Ok(result) if result.stop_reason == Some(StopReason::Cancelled) => {
                    session.set_state(SessionState::Cancelled);
                }
                Ok(_) => session.set_state(SessionState::AwaitingInput),
                Err(_) => session.set_state(SessionState::Failed),
            }
        }

        if let Ok(result) = &outcome {
            debug!(session_id = %session_id, stop_reason = ?result.stop_reason, "Prompt completed");
        }
        outcome
    }

    /// Ask the agent to stop the current turn. Fire-and-forget: no
    /// acknowledgement is awaited.
    pub async fn cancel(&self, session_id: &str) -> AcpResult<()> {
        let params = SessionCancelParams {
            session_id: session_id.to_string(),
        };
        self.notify(methods::SESSION_CANCEL, &params).await?;

        if let Some(session) = self.sessions.write().get_mut(session_id) {
            session.set_state(SessionState::Cancelled);
        }
        debug!(session_id = session_id, "Session cancelled");
        Ok(())
    }

    /// Get a session by ID
    pub fn session(&self, session_id: &str) -> Option<AcpSession> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Forget a session once its run is over; returns the final record
    pub fn close_session(&self, session_id: &str) -> Option<AcpSession> {
        let session = self.sessions.write().remove(session_id)?;
        debug!(
            session_id = session_id,
            turns = session.turn_count,
            state = ?session.state,
            "Session closed"
        );
        Some(session)
    }

    /// Stop the reader loop and close the transport
    pub async fn shutdown(&self) -> AcpResult<()> {
        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            reader.abort();
        }
        let failed = self.pending.close("connection shut down");
        if failed > 0 {
            warn!(failed = failed, "Shutting down with requests still outstanding");
        }
        self.transport.close().await
    }
}

impl Drop for AcpConnection {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.get_mut().take() {
            reader.abort();
        }
    }
}

// ============================================================================
// Reader loop
// ============================================================================

async fn read_loop(
    transport: Arc<dyn Transport>,
    pending: Arc<PendingRequests>,
    handler: Arc<dyn ClientHandler>,
) {
    while let Some(inbound) = transport.receive().await {
        let frame = match inbound {
            InboundFrame::Message(frame) => frame,
            InboundFrame::Oversized { head } => {
                fail_oversized_response(&pending, &head);
                continue;
            }
        };
        match IncomingMessage::parse(&frame) {
            Ok(IncomingMessage::Response { id, result }) => {
                match id.as_u64().and_then(|id| pending.take(id)) {
                    Some(tx) => {
                        if tx.send(Reply::Response(result)).is_err() {
                            debug!(id = %id, "Response arrived after the caller stopped waiting");
                        }
                    }
                    None => warn!(id = %id, "Dropping response for unknown request id"),
                }
            }
            Ok(IncomingMessage::Request { id, method, params }) => {
                spawn_request(Arc::clone(&transport), Arc::clone(&handler), id, method, params);
            }
            Ok(IncomingMessage::Notification { method, params }) => {
                dispatch_notification(handler.as_ref(), &method, params).await;
            }
            Err(error) => warn!(%error, "Discarding undecodable frame from agent"),
        }
    }

    let failed = pending.close("agent stream ended");
    if failed > 0 {
        warn!(failed = failed, "Agent stream ended with requests outstanding");
    } else {
        info!("Agent stream ended");
    }
}

/// Fail the request whose response was cut at the frame limit, when the
/// frame's head names one; anything else is only logged
fn fail_oversized_response(pending: &PendingRequests, head: &str) {
    match oversized_response_id(head).and_then(|id| pending.take(id).map(|tx| (id, tx))) {
        Some((id, tx)) => {
            warn!(id = id, "Response from agent exceeded the frame limit");
            if tx.send(Reply::Oversized).is_err() {
                debug!(id = id, "Oversized response arrived after the caller stopped waiting");
            }
        }
        None => warn!(bytes = head.len(), "Discarding oversized frame from agent"),
    }
}

/// Numeric id of a response frame, read from its first bytes
///
/// Only a top-level `"id"` that precedes the `"result"`/`"error"` key counts;
/// a frame that names a `"method"` first is a request or notification.
fn oversized_response_id(head: &str) -> Option<u64> {
    let id_at = head.find("\"id\"")?;
    let (first_key_at, first_key) = ["\"method\"", "\"result\"", "\"error\""]
        .into_iter()
        .filter_map(|key| head.find(key).map(|at| (at, key)))
        .min_by_key(|(at, _)| *at)?;
    if first_key_at < id_at || first_key == "\"method\"" {
        return None;
    }

    let value = head[id_at + "\"id\"".len()..]
        .trim_start()
        .strip_prefix(':')?
        .trim_start();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Answer an agent request on its own task so the reader keeps draining
fn spawn_request(
    transport: Arc<dyn Transport>,
    handler: Arc<dyn ClientHandler>,
    id: JsonRpcId,
    method: String,
    params: Value,
) {
    tokio::spawn(async move {
        debug!(method = %method, id = %id, "Handling agent request");
        let call_method = method.clone();
        let outcome =
            tokio::spawn(async move { dispatch_request(handler.as_ref(), &call_method, params).await })
                .await;

        let response = match outcome {
            Ok(Ok(result)) => JsonRpcResponse::success(id, result),
            Ok(Err(error)) => JsonRpcResponse::failure(Some(id), error),
            Err(join_error) => {
                warn!(method = %method, error = %join_error, "Agent request handler crashed");
                JsonRpcResponse::failure(
                    Some(id),
                    JsonRpcError::internal_error(format!("handler for {method} failed")),
                )
            }
        };

        match serde_json::to_string(&response) {
            Ok(frame) => {
                if let Err(error) = transport.send(&frame).await {
                    warn!(method = %method, %error, "Failed to answer agent request");
                }
            }
            Err(error) => warn!(method = %method, %error, "Failed to encode response"),
        }
    });
}

fn decode<T: DeserializeOwned>(method: &str, params: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(params)
        .map_err(|err| JsonRpcError::invalid_params(format!("Invalid params for {method}: {err}")))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|err| JsonRpcError::internal_error(err.to_string()))
}

async fn dispatch_request(
    handler: &dyn ClientHandler,
    method: &str,
    params: Value,
) -> Result<Value, JsonRpcError> {
    match method {
        methods::SESSION_REQUEST_PERMISSION => {
            let result = handler.request_permission(decode(method, params)?).await?;
            encode(&result)
        }
        methods::FS_READ_TEXT_FILE => {
            let result = handler.read_text_file(decode(method, params)?).await?;
            encode(&result)
        }
        methods::FS_WRITE_TEXT_FILE => {
            let result = handler.write_text_file(decode(method, params)?).await?;
            encode(&result)
        }
        other => Err(JsonRpcError::method_not_found(other)),
    }
}

async fn dispatch_notification(handler: &dyn ClientHandler, method: &str, params: Value) {
    match method {
        methods::SESSION_UPDATE => match serde_json::from_value::<SessionNotification>(params) {
            Ok(notification) => handler.session_notification(notification).await,
            Err(error) => warn!(%error, "Dropping malformed session/update"),
        },
        other => debug!(method = other, "Ignoring agent notification"),
    }
}
