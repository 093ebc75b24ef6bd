//! MCP surface: protocol types, registry, stdio server, tools and resources.

pub mod context;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod server;
pub mod tools;

pub use context::ToolContext;
pub use protocol::{McpError, ToolsCallResult};
pub use registry::McpRegistry;
pub use server::McpServer;
