//! Transports bind a [`ServerInstance`](crate::server::ServerInstance) to an
//! I/O channel.

pub mod socket;
pub mod stdio;

pub use socket::{
    attach_socket, EventTargetSignals, ListenerId, MessageSocket, Signal, SignalEvent, SignalHub,
    SignalListener, SocketAdapterOptions, SocketObserver, SubscribeSignals,
};
pub use stdio::{attach_stdio, StdioStreams, StdioTransport};

use crate::session::McpSession;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio_util::codec::LinesCodecError;
use tokio_util::sync::CancellationToken;

/// Error type for observers and stop callbacks supplied by callers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Socket exposes neither a subscribe nor an event-listener API")]
    NoListenerApi,

    #[error("Transport has already been started")]
    AlreadyStarted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Framing error: {0}")]
    Codec(#[from] LinesCodecError),

    #[error("Socket error: {0}")]
    Socket(String),
}

/// A protocol-level channel that can be attached to a server instance.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Start delivering inbound messages to `session`.
    async fn start(&self, session: Arc<McpSession>) -> Result<(), TransportError>;

    /// Stop the message pump.
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Whether [`Transport::dispose`] does anything beyond `close`.
    fn supports_dispose(&self) -> bool {
        false
    }

    /// Release resources held on behalf of the instance.
    async fn dispose(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

type DetachFn<T> = Box<dyn FnOnce() -> BoxFuture<'static, T> + Send>;

/// Handle returned by the attach functions. `detach` yields whatever the
/// transport hands back to the caller.
pub struct Detach<T = ()> {
    closed: CancellationToken,
    action: DetachFn<T>,
}

impl<T: Send + 'static> Detach<T> {
    pub(crate) fn new<F, Fut>(closed: CancellationToken, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            closed,
            action: Box::new(move || Box::pin(action())),
        }
    }

    /// Detach the transport from the server instance.
    pub async fn detach(self) -> T {
        (self.action)().await
    }

    /// Resolves once the channel has ended, whichever side ended it. The
    /// future does not borrow the handle.
    pub fn closed(&self) -> BoxFuture<'static, ()> {
        let closed = self.closed.clone();
        Box::pin(async move { closed.cancelled().await })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl<T> std::fmt::Debug for Detach<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detach")
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}
