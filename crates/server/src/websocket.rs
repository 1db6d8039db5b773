use crate::auth::{tenant_from_query, TenantQuery};
use crate::api::ApiResult;
use crate::config::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_core::tenant::TenantContext;
use tessera_mcp::transport::{
    attach_socket, EventTargetSignals, MessageSocket, SignalEvent, SignalHub, SocketAdapterOptions,
    TransportError,
};
use tessera_mcp::ServerInstance;
use tessera_sdk::RetryPolicy;
use tokio::sync::Mutex;

/// An axum WebSocket seen as a message socket. Inbound frames are read by
/// the connection task and emitted on the hub.
struct AxumSocket {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    open: AtomicBool,
    hub: SignalHub,
}

impl AxumSocket {
    fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
            open: AtomicBool::new(true),
            hub: SignalHub::new(),
        }
    }

    fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl MessageSocket for AxumSocket {
    async fn send(&self, message: String) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.mark_closed();
        let mut sink = self.sink.lock().await;
        // The peer may already be gone; a failed close frame is not an error
        let _ = sink.send(Message::Close(None)).await;
        sink.close()
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn event_target_api(&self) -> Option<&dyn EventTargetSignals> {
        Some(&self.hub)
    }
}

/// WebSocket handler: one server instance per connection
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<TenantQuery>,
) -> ApiResult<Response> {
    let context = tenant_from_query(&state.config, query)?;
    let retry_policy = state.config.retry;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, context, retry_policy)))
}

/// Handle individual WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    context: Arc<TenantContext>,
    retry_policy: RetryPolicy,
) {
    let span = context.span().clone();
    let (sink, mut stream) = socket.split();
    let socket = Arc::new(AxumSocket::new(sink));

    let server = match ServerInstance::builder(context).retry_policy(retry_policy).build() {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(parent: &span, error = %e, "Failed to create server instance");
            return;
        }
    };

    let detach = match attach_socket(&server, socket.clone(), SocketAdapterOptions::default()).await {
        Ok(detach) => detach,
        Err(e) => {
            tracing::error!(parent: &span, error = %e, "Failed to attach WebSocket");
            return;
        }
    };
    tracing::info!(parent: &span, "WebSocket connection established");

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                socket.hub.emit(SignalEvent::Message(text.as_str().to_owned()));
            }
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => socket.hub.emit(SignalEvent::Message(text)),
                Err(_) => tracing::debug!(parent: &span, "Ignoring non-UTF-8 binary frame"),
            },
            Ok(Message::Close(frame)) => {
                socket.mark_closed();
                socket.hub.emit(SignalEvent::Close {
                    code: frame.as_ref().map(|f| f.code),
                    reason: frame
                        .map(|f| f.reason.as_str().to_owned())
                        .filter(|reason| !reason.is_empty()),
                });
                break;
            }
            // Pongs are sent by axum
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                socket.hub.emit(SignalEvent::Error(e.to_string()));
                break;
            }
        }
    }

    if !detach.is_closed() {
        socket.mark_closed();
        socket.hub.emit(SignalEvent::Close {
            code: None,
            reason: None,
        });
    }
    detach.closed().await;

    tracing::info!(parent: &span, "WebSocket connection terminated");
}
