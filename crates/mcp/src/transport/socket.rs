//! Adapter for message-oriented duplex sockets.
//!
//! The socket reports inbound messages and its `close`/`error` signals to
//! listeners. Two listener styles are understood: `on`/`off` subscription
//! keyed by listener identity, and `add_event_listener` returning an id.
//! Teardown runs at most once whichever of close, error, detach or server
//! stop gets there first.

use crate::server::{ServerError, ServerInstance, TransportLease, WeakServerInstance};
use crate::session::McpSession;
use crate::transport::{BoxError, Detach, Transport, TransportError};
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tessera_core::context::{run_with_context, spawn_in_current_context};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Message,
    Close,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalEvent {
    Message(String),
    Close { code: Option<u16>, reason: Option<String> },
    Error(String),
}

impl SignalEvent {
    pub fn signal(&self) -> Signal {
        match self {
            SignalEvent::Message(_) => Signal::Message,
            SignalEvent::Close { .. } => Signal::Close,
            SignalEvent::Error(_) => Signal::Error,
        }
    }
}

pub type SignalListener = Arc<dyn Fn(SignalEvent) + Send + Sync>;

/// `on`/`off` listener style. `off` matches listeners by identity.
pub trait SubscribeSignals: Send + Sync {
    fn on(&self, signal: Signal, listener: SignalListener);
    fn off(&self, signal: Signal, listener: &SignalListener);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// `add_event_listener`/`remove_event_listener` listener style.
pub trait EventTargetSignals: Send + Sync {
    fn add_event_listener(&self, signal: Signal, listener: SignalListener) -> ListenerId;
    fn remove_event_listener(&self, signal: Signal, id: ListenerId);
}

#[async_trait::async_trait]
pub trait MessageSocket: Send + Sync {
    async fn send(&self, message: String) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;

    fn is_open(&self) -> bool;

    fn subscribe_api(&self) -> Option<&dyn SubscribeSignals> {
        None
    }

    fn event_target_api(&self) -> Option<&dyn EventTargetSignals> {
        None
    }
}

/// In-process listener table implementing both listener styles.
#[derive(Default)]
pub struct SignalHub {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Signal, SignalListener)>>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every listener registered for its signal.
    pub fn emit(&self, event: SignalEvent) {
        let signal = event.signal();
        let targets: Vec<SignalListener> = self
            .listeners
            .lock()
            .iter()
            .filter(|(_, s, _)| *s == signal)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        for listener in targets {
            listener(event.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn insert(&self, signal: Signal, listener: SignalListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().push((id, signal, listener));
        id
    }
}

impl SubscribeSignals for SignalHub {
    fn on(&self, signal: Signal, listener: SignalListener) {
        self.insert(signal, listener);
    }

    fn off(&self, signal: Signal, listener: &SignalListener) {
        self.listeners
            .lock()
            .retain(|(_, s, l)| !(*s == signal && Arc::ptr_eq(l, listener)));
    }
}

impl EventTargetSignals for SignalHub {
    fn add_event_listener(&self, signal: Signal, listener: SignalListener) -> ListenerId {
        self.insert(signal, listener)
    }

    fn remove_event_listener(&self, signal: Signal, id: ListenerId) {
        self.listeners
            .lock()
            .retain(|(i, s, _)| !(*s == signal && *i == id));
    }
}

/// Observer invoked with the signal that ended the socket.
pub type SocketObserver = Arc<dyn Fn(&SignalEvent) -> Result<(), BoxError> + Send + Sync>;

#[derive(Clone)]
pub struct SocketAdapterOptions {
    /// Stop the server instance when the socket closes or errors.
    pub auto_stop: bool,
    /// Close the socket during cleanup if it is still open.
    pub close_socket_on_detach: bool,
    pub on_close: Option<SocketObserver>,
    pub on_error: Option<SocketObserver>,
}

impl Default for SocketAdapterOptions {
    fn default() -> Self {
        Self {
            auto_stop: true,
            close_socket_on_detach: true,
            on_close: None,
            on_error: None,
        }
    }
}

impl SocketAdapterOptions {
    pub fn auto_stop(mut self, enabled: bool) -> Self {
        self.auto_stop = enabled;
        self
    }

    pub fn close_socket_on_detach(mut self, enabled: bool) -> Self {
        self.close_socket_on_detach = enabled;
        self
    }

    pub fn on_close<F>(mut self, observer: F) -> Self
    where
        F: Fn(&SignalEvent) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(observer));
        self
    }

    pub fn on_error<F>(mut self, observer: F) -> Self
    where
        F: Fn(&SignalEvent) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(observer));
        self
    }
}

impl std::fmt::Debug for SocketAdapterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketAdapterOptions")
            .field("auto_stop", &self.auto_stop)
            .field("close_socket_on_detach", &self.close_socket_on_detach)
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

enum Registration {
    Subscribe(SignalListener),
    EventTarget(Vec<(Signal, ListenerId)>),
}

const SIGNALS: [Signal; 3] = [Signal::Message, Signal::Close, Signal::Error];

fn register(socket: &dyn MessageSocket, listener: SignalListener) -> Result<Registration, TransportError> {
    if let Some(api) = socket.subscribe_api() {
        for signal in SIGNALS {
            api.on(signal, listener.clone());
        }
        return Ok(Registration::Subscribe(listener));
    }

    if let Some(api) = socket.event_target_api() {
        let ids = SIGNALS
            .into_iter()
            .map(|signal| (signal, api.add_event_listener(signal, listener.clone())))
            .collect();
        return Ok(Registration::EventTarget(ids));
    }

    Err(TransportError::NoListenerApi)
}

fn unregister(socket: &dyn MessageSocket, registration: Registration) {
    match registration {
        Registration::Subscribe(listener) => {
            if let Some(api) = socket.subscribe_api() {
                for signal in SIGNALS {
                    api.off(signal, &listener);
                }
            }
        }
        Registration::EventTarget(ids) => {
            if let Some(api) = socket.event_target_api() {
                for (signal, id) in ids {
                    api.remove_event_listener(signal, id);
                }
            }
        }
    }
}

struct SocketAdapter {
    me: Weak<SocketAdapter>,
    socket: Arc<dyn MessageSocket>,
    server: WeakServerInstance,
    options: SocketAdapterOptions,
    registration: Mutex<Option<Registration>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<SignalEvent>>>,
    session: Mutex<Option<Arc<McpSession>>>,
    lease: Mutex<Option<TransportLease>>,
    torn_down: AtomicBool,
    shutdown: CancellationToken,
    done: CancellationToken,
}

impl SocketAdapter {
    /// Claims teardown. Only the first caller gets `true`.
    fn begin_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::SeqCst)
    }

    fn detach_listeners(&self) {
        if let Some(registration) = self.registration.lock().take() {
            unregister(self.socket.as_ref(), registration);
        }
    }

    fn close_protocol(&self) {
        self.shutdown.cancel();
        if let Some(session) = self.session.lock().take() {
            session.close();
        }
    }

    async fn close_socket(&self) {
        if self.options.close_socket_on_detach && self.socket.is_open() {
            if let Err(e) = self.socket.close().await {
                warn!(error = %e, "Failed to close socket");
            }
        }
    }

    fn release_lease(&self) {
        if let Some(lease) = self.lease.lock().take() {
            lease.release();
        }
    }

    fn notify(&self, observer: Option<&SocketObserver>, event: &SignalEvent) {
        let Some(observer) = observer else {
            return;
        };
        match std::panic::catch_unwind(AssertUnwindSafe(|| observer(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(signal = ?event.signal(), error = %e, "Socket observer failed"),
            Err(_) => error!(signal = ?event.signal(), "Socket observer panicked"),
        }
    }

    async fn stop_server(&self) {
        if !self.options.auto_stop {
            return;
        }
        if let Some(server) = self.server.upgrade() {
            server.stop().await;
        }
    }

    async fn handle_close(&self, event: SignalEvent) {
        if !self.begin_teardown() {
            return;
        }
        info!(?event, "Socket closed");

        self.detach_listeners();
        self.close_protocol();
        self.notify(self.options.on_close.as_ref(), &event);
        self.release_lease();
        self.stop_server().await;
        self.done.cancel();
    }

    async fn handle_error(&self, event: SignalEvent) {
        if !self.begin_teardown() {
            return;
        }
        warn!(?event, "Socket error");

        self.notify(self.options.on_error.as_ref(), &event);
        self.detach_listeners();
        self.close_protocol();
        self.close_socket().await;
        self.release_lease();
        self.stop_server().await;
        self.done.cancel();
    }

    /// Cleanup shared by detach and dispose; no observers, no auto-stop.
    async fn cleanup(&self, close_protocol: bool) {
        if !self.begin_teardown() {
            return;
        }
        self.detach_listeners();
        if close_protocol {
            self.close_protocol();
        }
        self.close_socket().await;
        self.release_lease();
        self.done.cancel();
    }

    async fn pump(
        self: Arc<Self>,
        session: Arc<McpSession>,
        mut events: mpsc::UnboundedReceiver<SignalEvent>,
    ) {
        debug!(session = %session.id(), "Socket pump started");

        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                SignalEvent::Message(text) => {
                    let Some(reply) = session.handle_message(&text).await else {
                        continue;
                    };
                    if let Err(e) = self.socket.send(reply).await {
                        warn!(session = %session.id(), error = %e, "Failed to send response");
                    }
                }
                close @ SignalEvent::Close { .. } => {
                    self.handle_close(close).await;
                    break;
                }
                error @ SignalEvent::Error(_) => {
                    self.handle_error(error).await;
                    break;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for SocketAdapter {
    fn name(&self) -> &'static str {
        "socket"
    }

    async fn start(&self, session: Arc<McpSession>) -> Result<(), TransportError> {
        let events = self
            .events
            .lock()
            .take()
            .ok_or(TransportError::AlreadyStarted)?;
        let adapter = self.me.upgrade().ok_or(TransportError::AlreadyStarted)?;
        *self.session.lock() = Some(session.clone());

        spawn_in_current_context(adapter.pump(session, events));
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_protocol();
        Ok(())
    }

    fn supports_dispose(&self) -> bool {
        true
    }

    async fn dispose(&self) -> Result<(), TransportError> {
        self.cleanup(false).await;
        Ok(())
    }
}

/// Bind `server` to a message socket.
///
/// Listeners are registered before the protocol session starts so no
/// inbound message is missed. The returned [`Detach`] runs the full cleanup
/// including the optional socket close, without stopping the server.
pub async fn attach_socket(
    server: &ServerInstance,
    socket: Arc<dyn MessageSocket>,
    options: SocketAdapterOptions,
) -> Result<Detach, ServerError> {
    let (tx, rx) = mpsc::unbounded_channel::<SignalEvent>();
    let listener: SignalListener = Arc::new(move |event: SignalEvent| {
        let _ = tx.send(event);
    });
    let registration = register(socket.as_ref(), listener)?;

    let adapter = Arc::new_cyclic(|me| SocketAdapter {
        me: me.clone(),
        socket,
        server: server.downgrade(),
        options,
        registration: Mutex::new(Some(registration)),
        events: Mutex::new(Some(rx)),
        session: Mutex::new(None),
        lease: Mutex::new(None),
        torn_down: AtomicBool::new(false),
        shutdown: CancellationToken::new(),
        done: CancellationToken::new(),
    });

    let lease = match server.connect(adapter.clone()).await {
        Ok(lease) => lease,
        Err(e) => {
            adapter.detach_listeners();
            return Err(e);
        }
    };
    *adapter.lease.lock() = Some(lease);
    if adapter.torn_down.load(Ordering::SeqCst) {
        adapter.release_lease();
    }

    let context = server.context().clone();
    let done = adapter.done.clone();
    Ok(Detach::new(done, move || async move {
        run_with_context(context, adapter.cleanup(true)).await;
    }))
}
