// Newline-delimited JSON-RPC over caller-supplied byte streams

use crate::server::{ServerError, ServerInstance};
use crate::session::McpSession;
use crate::transport::{Detach, Transport, TransportError};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_core::context::spawn_in_current_context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// The channels a stdio session runs over. They stay owned by the caller:
/// detaching hands them back open.
pub struct StdioStreams {
    pub reader: Reader,
    pub writer: Writer,
    /// Optional channel for human-readable diagnostics.
    pub diagnostics: Option<Writer>,
}

impl StdioStreams {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            diagnostics: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.diagnostics = Some(Box::new(diagnostics));
        self
    }

    /// The process's stdin, stdout and stderr.
    pub fn process() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout()).with_diagnostics(tokio::io::stderr())
    }
}

pub struct StdioTransport {
    streams: Mutex<Option<StdioStreams>>,
    pump: Mutex<Option<JoinHandle<StdioStreams>>>,
    session: Mutex<Option<Arc<McpSession>>>,
    started: AtomicBool,
    shutdown: CancellationToken,
    finished: CancellationToken,
}

impl StdioTransport {
    pub fn new(streams: StdioStreams) -> Self {
        Self {
            streams: Mutex::new(Some(streams)),
            pump: Mutex::new(None),
            session: Mutex::new(None),
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            finished: CancellationToken::new(),
        }
    }

    /// Cancelled once the message pump has exited.
    pub fn finished(&self) -> CancellationToken {
        self.finished.clone()
    }

    /// Wait for the pump to exit and take back the streams. `None` if the
    /// transport never started or the streams were already reclaimed.
    pub async fn reclaim(&self) -> Option<StdioStreams> {
        if let Some(streams) = self.streams.lock().take() {
            return Some(streams);
        }
        let pump = self.pump.lock().take()?;
        match pump.await {
            Ok(streams) => Some(streams),
            Err(e) => {
                warn!(error = %e, "stdio pump task failed");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    fn name(&self) -> &'static str {
        "stdio"
    }

    async fn start(&self, session: Arc<McpSession>) -> Result<(), TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyStarted);
        }
        let streams = self
            .streams
            .lock()
            .take()
            .ok_or(TransportError::AlreadyStarted)?;
        *self.session.lock() = Some(session.clone());

        let shutdown = self.shutdown.clone();
        let finished = self.finished.clone();
        let handle = spawn_in_current_context(async move {
            let streams = pump(streams, session, shutdown).await;
            finished.cancel();
            streams
        });
        *self.pump.lock() = Some(handle);

        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shutdown.cancel();
        if let Some(session) = self.session.lock().take() {
            session.close();
        }
        Ok(())
    }

    // The streams belong to the caller and are returned through `reclaim`.
    fn supports_dispose(&self) -> bool {
        true
    }

    async fn dispose(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

async fn pump(
    streams: StdioStreams,
    session: Arc<McpSession>,
    shutdown: CancellationToken,
) -> StdioStreams {
    let StdioStreams {
        reader,
        writer,
        mut diagnostics,
    } = streams;
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    debug!(session = %session.id(), "stdio pump started");

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = lines.next() => next,
        };

        match next {
            Some(Ok(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let Some(reply) = session.handle_message(&line).await else {
                    continue;
                };
                if let Err(e) = sink.send(reply).await {
                    warn!(error = %e, "Failed to write response");
                    report(&mut diagnostics, e.to_string()).await;
                    break;
                }
            }
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                warn!(limit = MAX_LINE_LENGTH, "Discarded oversized message");
                report(
                    &mut diagnostics,
                    LinesCodecError::MaxLineLengthExceeded.to_string(),
                )
                .await;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Failed to read from input");
                report(&mut diagnostics, e.to_string()).await;
                break;
            }
            None => {
                debug!(session = %session.id(), "Input stream ended");
                break;
            }
        }
    }

    StdioStreams {
        reader: lines.into_inner(),
        writer: sink.into_inner(),
        diagnostics,
    }
}

async fn report(diagnostics: &mut Option<Writer>, message: String) {
    if let Some(out) = diagnostics.as_mut() {
        let line = format!("tessera-mcp: {}\n", message);
        if out.write_all(line.as_bytes()).await.is_err() {
            *diagnostics = None;
        }
    }
}

/// Bind `server` to a pair of byte streams.
///
/// The returned [`Detach`] stops the message pump, untracks the transport
/// and hands the still-open streams back to the caller.
pub async fn attach_stdio(
    server: &ServerInstance,
    streams: StdioStreams,
) -> Result<Detach<Option<StdioStreams>>, ServerError> {
    let transport = Arc::new(StdioTransport::new(streams));
    let lease = server.connect(transport.clone()).await?;

    Ok(Detach::new(transport.finished(), move || async move {
        if let Err(e) = transport.close().await {
            warn!(error = %e, "Failed to close stdio transport");
        }
        lease.release();
        transport.reclaim().await
    }))
}
