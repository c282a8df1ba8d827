use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::client::DualcastNode;
use crate::domains::events::{ChannelEvent, ClientEvent};
use crate::domains::health::{HealthState, Recommendation, TransportHealth};
use crate::domains::message::{Message, TransportMode};
use crate::error::{DualcastError, Result};
use crate::scheduler::Scheduler;
use crate::services::dispatcher::Dispatcher;
use crate::services::health::HealthView;
use crate::services::live_channel::{ConnectionHandle, ConnectionRegistry};

pub const DEFAULT_HTTP_SENDER: &str = "http";

/// Inbound frames dispatched concurrently per connection. Reading pauses
/// while the limit is reached.
pub const MAX_FRAMES_IN_FLIGHT: usize = 8;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<ConnectionRegistry>,
    pub health: HealthView,
}

impl AppState {
    pub fn from_node(node: &DualcastNode) -> Self {
        Self {
            dispatcher: node.dispatcher(),
            registry: node.registry(),
            health: node.health(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Deserialize)]
struct DeliverRequest {
    recipient_id: Option<String>,
    payload: Option<String>,
    mode: Option<String>,
    sender_id: Option<String>,
}

#[derive(Serialize)]
struct TransportStatusResponse {
    recommendation: Recommendation,
    live_channel: TransportHealth,
    content_store: TransportHealth,
}

#[derive(Deserialize)]
struct WsQuery {
    user_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    error_kind: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/deliver", post(deliver))
        .route("/transport_status", get(transport_status))
        .route("/content_status", get(content_status))
        .route("/ws", get(live_channel))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

fn error_response(status: StatusCode, err: &DualcastError) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            error_kind: err.kind().to_string(),
        }),
    )
        .into_response()
}

pub fn build_message(
    sender_id: &str,
    recipient_id: Option<String>,
    payload: Option<String>,
    mode: Option<TransportMode>,
) -> Result<Message> {
    let recipient_id = recipient_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| DualcastError::Validation("missing recipient_id".to_string()))?;
    let payload = payload
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| DualcastError::Validation("missing payload".to_string()))?;
    let payload = BASE64
        .decode(payload.trim().as_bytes())
        .map_err(|e| DualcastError::Validation(format!("payload is not valid base64: {e}")))?;
    Ok(Message::new(
        sender_id,
        recipient_id,
        payload,
        mode.unwrap_or_default(),
    ))
}

async fn deliver(
    State(state): State<AppState>,
    request: std::result::Result<Json<DeliverRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &DualcastError::Validation(rejection.body_text()),
            );
        }
    };
    let mode = match request.mode.as_deref().map(str::parse::<TransportMode>) {
        Some(Ok(mode)) => Some(mode),
        Some(Err(err)) => return error_response(StatusCode::BAD_REQUEST, &err),
        None => None,
    };
    let sender_id = request
        .sender_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_HTTP_SENDER);
    let message = match build_message(sender_id, request.recipient_id, request.payload, mode) {
        Ok(message) => message,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err),
    };
    if let Err(err) = state.dispatcher.admit(message.transport_mode()) {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, &err);
    }
    let result = state.dispatcher.dispatch(&message).await;
    (StatusCode::OK, Json(result)).into_response()
}

async fn transport_status(State(state): State<AppState>) -> Json<TransportStatusResponse> {
    let snapshot = state.health.current();
    Json(TransportStatusResponse {
        recommendation: snapshot.recommendation(),
        live_channel: snapshot.live_channel,
        content_store: snapshot.content_store,
    })
}

async fn content_status(State(state): State<AppState>) -> Json<Value> {
    if !state.dispatcher.has_content_store() {
        return Json(json!({"status": "disabled"}));
    }
    let health = state.health.current().content_store;
    let status = match health.state() {
        HealthState::Unknown => "unknown",
        HealthState::Healthy => "ok",
        HealthState::Unhealthy => "unavailable",
    };
    let mut body = serde_json::Map::new();
    body.insert("status".to_string(), json!(status));
    for (key, value) in health.detail {
        body.insert(key, value);
    }
    if let Some(error) = health.error {
        body.insert("error".to_string(), json!(error));
    }
    if let Some(checked) = health.last_checked.and_then(|ts| ts.format(&Rfc3339).ok()) {
        body.insert("last_checked".to_string(), json!(checked));
    }
    Json(Value::Object(body))
}

async fn live_channel(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(user_id) = query
        .user_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            &DualcastError::Validation("missing user_id".to_string()),
        );
    };
    if !state.registry.is_accepting() {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &DualcastError::ChannelFailed("live channel is shutting down".to_string()),
        );
    }
    ws.on_upgrade(move |socket| handle_socket(state, user_id, socket))
}

async fn handle_socket(state: AppState, user_id: String, socket: WebSocket) {
    let ConnectionHandle {
        connection_id,
        sender,
        mut receiver,
        ..
    } = match state.registry.register(&user_id).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(%user_id, error = %err, "rejecting live connection");
            return;
        }
    };
    let (mut sink, mut stream) = socket.split();
    let reply_timeout = state.registry.send_timeout();
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            outbound = receiver.recv() => {
                let Some(event) = outbound else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "failed to encode channel event");
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            inbound = stream.next(), if in_flight.len() < MAX_FRAMES_IN_FLIGHT => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        let dispatcher = state.dispatcher.clone();
                        let reply = sender.clone();
                        let sender_id = user_id.clone();
                        in_flight.spawn(async move {
                            reply_to_client(&dispatcher, &sender_id, &text, &reply, reply_timeout)
                                .await;
                        });
                    }
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    in_flight.shutdown().await;
    state.registry.unregister(&user_id, connection_id).await;
}

/// Runs one inbound frame and queues the reply for the originating
/// connection. Returns false when the reply could not be queued within
/// `reply_timeout`.
pub async fn reply_to_client(
    dispatcher: &Dispatcher,
    sender_id: &str,
    raw: &str,
    reply: &mpsc::Sender<ChannelEvent>,
    reply_timeout: Duration,
) -> bool {
    let event = process_client_event(dispatcher, sender_id, raw).await;
    match reply.send_timeout(event, reply_timeout).await {
        Ok(()) => true,
        Err(SendTimeoutError::Timeout(_)) => {
            warn!(%sender_id, "reply queue full; dropping reply");
            false
        }
        Err(SendTimeoutError::Closed(_)) => {
            debug!(%sender_id, "connection closed before reply");
            false
        }
    }
}

fn error_event(err: &DualcastError) -> ChannelEvent {
    ChannelEvent::Error {
        error_kind: err.kind().to_string(),
        message: err.to_string(),
    }
}

/// Handles one inbound live-channel frame and returns the event for the
/// originating connection.
pub async fn process_client_event(
    dispatcher: &Dispatcher,
    sender_id: &str,
    raw: &str,
) -> ChannelEvent {
    let event = match serde_json::from_str::<ClientEvent>(raw) {
        Ok(event) => event,
        Err(err) => {
            return error_event(&DualcastError::Validation(format!("invalid event: {err}")));
        }
    };
    match event {
        ClientEvent::SendEncryptedMessage {
            payload,
            recipient_id,
            transport_preference,
        } => {
            let message =
                match build_message(sender_id, Some(recipient_id), payload, transport_preference) {
                    Ok(message) => message,
                    Err(err) => return error_event(&err),
                };
            match dispatcher.deliver(&message).await {
                Ok(result) => ChannelEvent::MessageSent {
                    message_id: result.message_id,
                    result,
                },
                Err(err) => error_event(&err),
            }
        }
    }
}

pub async fn run(node: DualcastNode) -> Result<()> {
    let host = node.config().host();
    let port = node.config().port();
    run_with_shutdown(node, &host, port, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(node: DualcastNode, host: &str, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut scheduler = Scheduler::new();
    scheduler.register_job(node.monitor());
    scheduler.start();

    let registry = node.registry();
    let app = build_router(AppState::from_node(&node));

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DualcastError::Runtime(e.to_string()))?;
    info!(%addr, "dualcast daemon listening");
    let shutdown = async move {
        shutdown.await;
        registry.close().await;
        scheduler.stop().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| DualcastError::Runtime(e.to_string()))?;

    Ok(())
}
