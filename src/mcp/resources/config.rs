//! Config Resources
//!
//! Resources for accessing server configuration.

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::ResourceContent;
use crate::mcp::registry::{McpRegistry, RegisteredResource, ResourceBuilder, ResourceResult};

/// Register config resources with the registry
pub fn register_resources(registry: &mut McpRegistry) {
    registry.register_resource(server_config_resource());
}

// ============================================================================
// config://server
// ============================================================================

fn server_config_resource() -> RegisteredResource {
    ResourceBuilder::new("config://server", "Server Configuration")
        .description("Current server configuration settings (read-only view)")
        .mime_type("application/json")
        .build(server_config_handler)
}

async fn server_config_handler(ctx: ToolContext, uri: String) -> ResourceResult {
    let config = &ctx.config;

    // Sanitized view: the API key itself is never exposed.
    let config_view = serde_json::json!({
        "api": {
            "base_url": config.api.base_url,
            "timeout_secs": config.api.timeout_secs,
            "has_api_key": !config.api.api_key.is_empty(),
            "allow_insecure_tls": config.api.allow_insecure_tls,
            "has_ca_bundle": config.api.ca_bundle_path.is_some(),
        },
        "subscriptions": {
            "default_folder": config.subscriptions.default_folder,
            "default_subscription_type": config.subscriptions.default_subscription_type,
        },
        "findings": {
            "max_findings": config.findings.max_findings,
            "risk_vector_filter": config.findings.risk_vector_filter,
        },
        "context": config.context.as_str(),
        "skip_startup_checks": config.skip_startup_checks,
        "runtime": {
            "version": ctx.server_version.clone(),
            "uptime_secs": ctx.start_time.elapsed().as_secs(),
        }
    });

    let content = ResourceContent::Text {
        uri,
        mime_type: Some("application/json".to_string()),
        text: serde_json::to_string_pretty(&config_view).unwrap_or_default(),
    };

    Ok(vec![content])
}
