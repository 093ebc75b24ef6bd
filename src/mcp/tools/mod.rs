//! MCP Tools
//!
//! Tool implementations exposed over the MCP surface. Which tools are
//! registered depends on the configured server context.

pub mod rating;
pub mod search;
pub mod subscriptions;

use serde_json::{json, Value};

use crate::config::ServerContext;
use crate::rating::RatingError;

use super::registry::McpRegistry;

/// Register all tools for the given context. The risk-manager context
/// additionally exposes subscription management and company onboarding.
pub fn register_all_tools(registry: &mut McpRegistry, context: ServerContext) {
    rating::register_tools(registry);
    search::register_tools(registry);
    if context == ServerContext::RiskManager {
        subscriptions::register_tools(registry);
    }
}

/// Caller-facing error payload for a domain failure. Kept a normal tool
/// result; protocol errors are reserved for malformed requests.
pub(crate) fn error_payload(e: &RatingError) -> Value {
    match e {
        RatingError::RatingFetchFailed {
            cleanup_failures, ..
        } if !cleanup_failures.is_empty() => json!({
            "error": e.to_string(),
            "cleanup_failures": cleanup_failures,
        }),
        other => json!({"error": other.to_string()}),
    }
}
