//! Multi-tenant MCP session runtime.
//!
//! A [`ServerInstance`] owns one tenant's context and tool registry. Transports
//! (stdio streams or message sockets) attach to it; every tool call they
//! deliver runs inside that tenant's ambient scope.

pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;

pub use server::{
    Lifecycle, ServerError, ServerInstance, ServerInstanceBuilder, StopSubscription, TransportLease,
    WeakServerInstance,
};
pub use session::{McpSession, SessionState};
pub use tools::{register_content_tools, ToolError, ToolRegistry};
pub use transport::{attach_socket, attach_stdio, Detach, SocketAdapterOptions, StdioStreams, Transport};
