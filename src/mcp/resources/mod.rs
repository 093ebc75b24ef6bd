//! MCP Resources
//!
//! Read-only resource implementations.

pub mod config;

use super::registry::McpRegistry;

/// Register all resources with the registry
pub fn register_all_resources(registry: &mut McpRegistry) {
    config::register_resources(registry);
}
