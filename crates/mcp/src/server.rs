//! Server instance: one tenant, one tool registry, any number of attached
//! transports.
//!
//! ```text
//!   Idle --connect--> Active --stop--> Stopped --connect--> Active
//! ```

use crate::protocol::{ServerInfo, ToolSchema};
use crate::session::{McpSession, SessionState};
use crate::tools::{register_content_tools, RegistryError, ToolError, ToolRegistry, INSTRUCTIONS};
use crate::transport::{BoxError, Transport, TransportError};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tessera_core::context::run_with_context;
use tessera_core::tenant::TenantContext;
use tessera_sdk::RetryPolicy;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to attach transport: {0}")]
    Attach(#[from] TransportError),

    #[error("Failed to register tools: {0}")]
    Registry(#[from] RegistryError),
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No transport attached yet.
    Idle,
    /// At least one transport attached.
    Active,
    /// `stop` ran and nothing has connected since.
    Stopped,
}

type StopCallback = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;
type Catalogue = Box<dyn FnOnce(&mut ToolRegistry) -> Result<(), RegistryError> + Send>;

struct Attached {
    transport: Arc<dyn Transport>,
    session: Arc<McpSession>,
}

struct Inner {
    context: Arc<TenantContext>,
    registry: Arc<ToolRegistry>,
    info: ServerInfo,
    instructions: Option<String>,
    transports: Mutex<HashMap<u64, Attached>>,
    stop_callbacks: Mutex<Vec<(u64, StopCallback)>>,
    next_id: AtomicU64,
    stopped: AtomicBool,
}

/// The unit of multi-tenancy.
#[derive(Clone)]
pub struct ServerInstance {
    inner: Arc<Inner>,
}

/// Non-owning reference held by transports and leases.
#[derive(Clone)]
pub struct WeakServerInstance {
    inner: Weak<Inner>,
}

impl WeakServerInstance {
    pub fn upgrade(&self) -> Option<ServerInstance> {
        self.inner.upgrade().map(|inner| ServerInstance { inner })
    }
}

pub struct ServerInstanceBuilder {
    context: Arc<TenantContext>,
    info: ServerInfo,
    instructions: Option<String>,
    retry_policy: RetryPolicy,
    catalogue: Catalogue,
}

impl ServerInstanceBuilder {
    pub fn server_info(mut self, info: ServerInfo) -> Self {
        self.info = info;
        self
    }

    pub fn instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Retry policy for the content client shared by this instance's tools.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Replace the default content tool catalogue.
    pub fn tools<F>(mut self, catalogue: F) -> Self
    where
        F: FnOnce(&mut ToolRegistry) -> Result<(), RegistryError> + Send + 'static,
    {
        self.catalogue = Box::new(catalogue);
        self
    }

    pub fn build(self) -> Result<ServerInstance, ServerError> {
        let Self {
            context,
            info,
            instructions,
            retry_policy,
            catalogue,
        } = self;

        let session_state = Arc::new(SessionState::default());
        let mut registry =
            ToolRegistry::with_retry_policy(context.clone(), session_state, retry_policy);
        catalogue(&mut registry)?;

        debug!(parent: context.span(), tools = registry.len(), "Server instance created");

        Ok(ServerInstance {
            inner: Arc::new(Inner {
                context,
                registry: Arc::new(registry),
                info,
                instructions,
                transports: Mutex::new(HashMap::new()),
                stop_callbacks: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                stopped: AtomicBool::new(false),
            }),
        })
    }
}

impl ServerInstance {
    /// A server instance with the content tool catalogue.
    pub fn new(context: Arc<TenantContext>) -> Result<Self, ServerError> {
        Self::builder(context).build()
    }

    pub fn builder(context: Arc<TenantContext>) -> ServerInstanceBuilder {
        ServerInstanceBuilder {
            context,
            info: ServerInfo::default(),
            instructions: Some(INSTRUCTIONS.to_string()),
            retry_policy: RetryPolicy::default(),
            catalogue: Box::new(register_content_tools),
        }
    }

    pub fn downgrade(&self) -> WeakServerInstance {
        WeakServerInstance {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn context(&self) -> &Arc<TenantContext> {
        &self.inner.context
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.inner.registry
    }

    pub fn list_tools(&self) -> Vec<ToolSchema> {
        self.inner.registry.list_tools()
    }

    /// Invoke a tool inside the tenant scope. Handler failures are returned
    /// as they are.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        self.inner.registry.call(name, arguments).await
    }

    pub fn state(&self) -> Lifecycle {
        if !self.inner.transports.lock().is_empty() {
            Lifecycle::Active
        } else if self.inner.stopped.load(Ordering::SeqCst) {
            Lifecycle::Stopped
        } else {
            Lifecycle::Idle
        }
    }

    pub fn transport_count(&self) -> usize {
        self.inner.transports.lock().len()
    }

    pub fn initial_context_loaded(&self) -> bool {
        self.session_state().initial_context_loaded()
    }

    pub fn session_state(&self) -> &Arc<SessionState> {
        self.inner.registry.session()
    }

    /// A fresh protocol session over this instance's registry.
    pub fn new_session(&self) -> McpSession {
        let session = McpSession::new(self.inner.registry.clone(), self.inner.info.clone());
        match &self.inner.instructions {
            Some(instructions) => session.with_instructions(instructions.clone()),
            None => session,
        }
    }

    /// Attach a transport and start its message pump inside the tenant scope.
    ///
    /// The transport is tracked before it starts, so a `stop` that runs
    /// while `start` is pending still closes it.
    pub async fn connect(&self, transport: Arc<dyn Transport>) -> Result<TransportLease, ServerError> {
        let session = Arc::new(self.new_session());

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.transports.lock().insert(
            id,
            Attached {
                transport: transport.clone(),
                session: session.clone(),
            },
        );
        let was_stopped = self.inner.stopped.swap(false, Ordering::SeqCst);

        let started = run_with_context(self.inner.context.clone(), transport.start(session)).await;
        if let Err(e) = started {
            if self.untrack(id) && self.inner.transports.lock().is_empty() {
                self.inner.stopped.store(was_stopped, Ordering::SeqCst);
            }
            return Err(e.into());
        }

        let disposable = transport.supports_dispose();
        let tracked = self.inner.transports.lock().contains_key(&id);

        if !tracked {
            // stop drained the set while start was pending and closed the
            // transport before its pump existed
            warn!(
                parent: self.inner.context.span(),
                transport = transport.name(),
                transport_id = id,
                "Server stopped during attach, closing transport"
            );
            if let Err(e) = transport.close().await {
                warn!(parent: self.inner.context.span(), transport_id = id, error = %e, "Failed to close transport");
            }
        } else {
            info!(
                parent: self.inner.context.span(),
                transport = transport.name(),
                transport_id = id,
                "Transport connected"
            );

            if !disposable {
                let server = self.downgrade();
                self.on_stop(move || async move {
                    if let Some(server) = server.upgrade() {
                        server.untrack(id);
                    }
                    Ok(())
                });
            }
        }

        Ok(TransportLease {
            id,
            server: self.downgrade(),
            transport,
            disposable,
        })
    }

    fn untrack(&self, id: u64) -> bool {
        let removed = self.inner.transports.lock().remove(&id);
        if removed.is_some() {
            debug!(parent: self.inner.context.span(), transport_id = id, "Transport untracked");
        }
        removed.is_some()
    }

    /// Register a callback to run once during the next `stop`.
    pub fn on_stop<F, Fut>(&self, callback: F) -> StopSubscription
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let callback: StopCallback = Box::new(move || callback().boxed());
        self.inner.stop_callbacks.lock().push((id, callback));

        StopSubscription {
            id,
            server: self.downgrade(),
        }
    }

    /// Close every transport, run the stop callbacks and reset session
    /// flags. Never fails; problems are logged.
    pub async fn stop(&self) {
        let inner = &self.inner;

        run_with_context(inner.context.clone(), async {
            let attached: Vec<(u64, Attached)> = inner.transports.lock().drain().collect();

            futures::future::join_all(attached.iter().map(|(id, entry)| async move {
                if let Err(e) = entry.transport.close().await {
                    warn!(transport_id = id, error = %e, "Failed to close transport");
                }
                if entry.transport.supports_dispose() {
                    if let Err(e) = entry.transport.dispose().await {
                        warn!(transport_id = id, error = %e, "Failed to dispose transport");
                    }
                }
            }))
            .await;

            for (_, entry) in &attached {
                entry.session.close();
            }

            let callbacks = std::mem::take(&mut *inner.stop_callbacks.lock());
            for (id, callback) in callbacks {
                match AssertUnwindSafe(async move { callback().await })
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(callback_id = id, error = %e, "Stop callback failed"),
                    Err(_) => warn!(callback_id = id, "Stop callback panicked"),
                }
            }

            inner.registry.session().reset();
            inner.stopped.store(true, Ordering::SeqCst);

            info!(transports = attached.len(), "Server instance stopped");
        })
        .await
    }
}

/// Ties a connected transport to the instance's tracked set.
pub struct TransportLease {
    id: u64,
    server: WeakServerInstance,
    transport: Arc<dyn Transport>,
    disposable: bool,
}

impl std::fmt::Debug for TransportLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLease")
            .field("id", &self.id)
            .field("transport", &self.transport.name())
            .field("disposable", &self.disposable)
            .finish()
    }
}

impl TransportLease {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_disposable(&self) -> bool {
        self.disposable
    }

    /// Dispose the transport and stop tracking it.
    pub async fn dispose(&self) -> Result<(), TransportError> {
        self.release();
        if self.disposable {
            self.transport.dispose().await
        } else {
            Ok(())
        }
    }

    /// Stop tracking the transport without disposing it.
    pub fn release(&self) -> bool {
        self.server
            .upgrade()
            .is_some_and(|server| server.untrack(self.id))
    }
}

/// Returned by [`ServerInstance::on_stop`].
pub struct StopSubscription {
    id: u64,
    server: WeakServerInstance,
}

impl StopSubscription {
    /// Remove the callback. Returns `false` if it already ran or was removed.
    pub fn unsubscribe(self) -> bool {
        let Some(server) = self.server.upgrade() else {
            return false;
        };
        let mut callbacks = server.inner.stop_callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(id, _)| *id != self.id);
        callbacks.len() != before
    }
}
