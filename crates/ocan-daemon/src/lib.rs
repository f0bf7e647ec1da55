// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP/WebSocket daemon: wires the tool/entity-type registries, the
//! temporal store, the subscription engine, and the JSON-RPC dispatcher
//! behind an Axum server.

use axum::{
    extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use ocan_config::DaemonConfig;
use ocan_registry::{EntityTypeRegistry, ToolRegistry};
use ocan_rpc::{ConnectionState, Dispatcher, TransportEnvelope};
use ocan_store::TemporalStore;
use ocan_subscriptions::{ConnectionSink, SubscriptionEngine};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// WebSocket close code used when the MCP handshake doesn't complete
/// within [`DaemonConfig::init_timeout_secs`].
const CLOSE_INITIALIZATION_TIMEOUT: u16 = 4408;

/// Outgoing messages queued for a socket's writer task: either a JSON-RPC
/// frame or an instruction to close the connection.
enum Outbound {
    Frame(String),
    Close(u16),
}

/// Fans outgoing notifications out to every live socket tagged with a
/// given `subscriberId`. A subscriber is a logical stream that may be
/// carried by zero or more active sockets at once; delivery to each is
/// fire-and-forget.
#[derive(Default)]
pub struct ConnectionIndex {
    senders: RwLock<HashMap<String, Vec<mpsc::UnboundedSender<Outbound>>>>,
}

impl ConnectionIndex {
    fn register(&self, subscriber_id: &str, sender: mpsc::UnboundedSender<Outbound>) {
        self.senders
            .write()
            .expect("connection index lock poisoned")
            .entry(subscriber_id.to_string())
            .or_default()
            .push(sender);
    }

    fn deregister(&self, subscriber_id: &str, sender: &mpsc::UnboundedSender<Outbound>) {
        let mut senders = self.senders.write().expect("connection index lock poisoned");
        if let Some(list) = senders.get_mut(subscriber_id) {
            list.retain(|s| !s.same_channel(sender));
            if list.is_empty() {
                senders.remove(subscriber_id);
            }
        }
    }
}

impl ConnectionSink for ConnectionIndex {
    fn send_notification(&self, subscriber_id: &str, uri: &str, payload: serde_json::Value) {
        let senders = self.senders.read().expect("connection index lock poisoned");
        let Some(list) = senders.get(subscriber_id) else {
            return;
        };
        let Ok(text) = serde_json::to_string(&payload) else {
            warn!(subscriber_id, uri, "failed to serialize notification payload");
            return;
        };
        for sender in list {
            let _ = sender.send(Outbound::Frame(text.clone()));
        }
    }
}

/// Shared daemon state handed to every Axum route.
pub struct AppState {
    pub config: DaemonConfig,
    pub dispatcher: Arc<Dispatcher>,
    pub connections: Arc<ConnectionIndex>,
}

/// Build the Axum router with the daemon's HTTP and WebSocket routes.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(cmd_health))
        .route("/mcp", get(cmd_ws_upgrade))
        .route("/rpc", axum::routing::post(cmd_rpc))
        .with_state(state)
}

async fn cmd_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "protocolVersion": ocan_rpc::SUPPORTED_PROTOCOL_VERSION,
        "bindAddr": state.config.bind_addr,
        "time": Utc::now().to_rfc3339(),
    }))
}

/// One-shot JSON-RPC over plain HTTP, for stateless callers like `ocanctl`
/// that don't perform (and don't need) the MCP handshake.
async fn cmd_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ocan_rpc::JsonRpcRequest>,
) -> impl IntoResponse {
    let mut conn = ConnectionState::preinitialized("ocanctl");
    match state.dispatcher.handle(&mut conn, request) {
        Some(response) => Json(response).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    #[serde(rename = "subscriberId")]
    subscriber_id: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn cmd_ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(subscriber_id) = params.subscriber_id else {
        return (StatusCode::BAD_REQUEST, "subscriberId query parameter is required").into_response();
    };
    let session_id = params.session_id.or_else(|| session_id_from_cookie(&headers));

    ws.on_upgrade(move |socket| handle_socket(socket, state, subscriber_id, session_id))
}

fn session_id_from_cookie(headers: &HeaderMap) -> Option<String> {
    let cookie = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookie.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == "sessionId").then(|| value.to_string())
    })
}

/// Drive one MCP connection: a reader loop dispatching incoming frames
/// and a writer task draining outgoing notifications/responses, tied
/// together by the connection's [`ConnectionState`].
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, subscriber_id: String, session_id: Option<String>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    state.connections.register(&subscriber_id, tx.clone());

    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let sent = match outbound {
                Outbound::Frame(text) => sink.send(Message::Text(text.into())).await,
                Outbound::Close(code) => {
                    let frame = CloseFrame { code, reason: "".into() };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            };
            if sent.is_err() {
                break;
            }
        }
    });

    let mut conn = ConnectionState::new(subscriber_id.clone(), session_id);
    let init_timeout = Duration::from_secs(state.config.init_timeout_secs);

    loop {
        let watchdog = tokio::time::sleep(init_timeout);
        tokio::select! {
            incoming = stream.next() => {
                let Some(Ok(message)) = incoming else { break };
                let Message::Text(text) = message else { continue };
                dispatch_frame(&state, &mut conn, &text, &tx);
            }
            _ = watchdog, if !conn.is_initialized() => {
                if conn.initialization_timed_out(init_timeout) {
                    let _ = tx.send(Outbound::Frame(
                        json!({"jsonrpc": "2.0", "error": {"code": -32600, "message": "initialization timed out"}}).to_string(),
                    ));
                    let _ = tx.send(Outbound::Close(CLOSE_INITIALIZATION_TIMEOUT));
                    break;
                }
            }
        }
    }

    state.dispatcher.subscriptions.remove_all_subscriptions_for_subscriber(&subscriber_id);
    state.connections.deregister(&subscriber_id, &tx);
    writer.abort();
    info!(subscriber_id, "connection closed");
}

fn dispatch_frame(state: &Arc<AppState>, conn: &mut ConnectionState, text: &str, tx: &mpsc::UnboundedSender<Outbound>) {
    let envelope: TransportEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(subscriber_id = %conn.subscriber_id, error = %err, "failed to parse incoming MCP frame");
            return;
        }
    };

    if let Some(response) = state.dispatcher.handle(conn, envelope.into_request()) {
        if let Ok(text) = serde_json::to_string(&response) {
            let _ = tx.send(Outbound::Frame(text));
        }
    }
}

/// Construct the daemon's components from a loaded [`DaemonConfig`].
#[must_use]
pub fn build_state(config: DaemonConfig) -> Arc<AppState> {
    let tools = Arc::new(ToolRegistry::new());
    let entity_types = Arc::new(EntityTypeRegistry::new());
    let store = Arc::new(TemporalStore::new(entity_types.clone()));
    let connections = Arc::new(ConnectionIndex::default());
    let subscriptions = Arc::new(SubscriptionEngine::new(connections.clone()));
    store.register_observer(subscriptions.clone());

    let dispatcher = Arc::new(Dispatcher {
        tools,
        entity_types,
        store,
        subscriptions,
        server_name: "ocan-daemon".into(),
        server_version: config.protocol_version.clone(),
    });

    Arc::new(AppState { config, dispatcher, connections })
}
