//! Subscription Tools
//!
//! Explicit subscription management and company onboarding. Only registered
//! in the risk-manager context.

use serde::Deserialize;
use serde_json::Value;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{McpError, ToolsCallResult};
use crate::mcp::registry::{McpRegistry, RegisteredTool, ToolBuilder, ToolCategory, ToolResult};
use crate::rating::RatingOrchestrator;

/// Register subscription tools with the registry
pub fn register_tools(registry: &mut McpRegistry) {
    registry.register_tool(manage_subscriptions_tool());
    registry.register_tool(company_request_tool());
}

fn orchestrator(ctx: &ToolContext) -> RatingOrchestrator {
    RatingOrchestrator::new(
        ctx.api.clone(),
        ctx.config.subscriptions.clone(),
        ctx.config.findings.clone(),
    )
}

// ============================================================================
// subscriptions.manage
// ============================================================================

#[derive(Debug, Deserialize)]
struct ManageSubscriptionsParams {
    action: String,
    /// Array of guids or a comma-separated string.
    guids: Value,
    folder: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

fn manage_subscriptions_tool() -> RegisteredTool {
    ToolBuilder::new("subscriptions.manage")
        .description(
            "Subscribe or unsubscribe companies in bulk. Subscriptions created here are \
             persistent. Use dry_run to preview the outcome without applying changes.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "subscribe (aliases: add, create, subscription) or unsubscribe (aliases: remove, delete)"
                },
                "guids": {
                    "description": "Company guids: JSON array of strings or one comma-separated string",
                    "anyOf": [
                        {"type": "array", "items": {"type": "string"}},
                        {"type": "string"}
                    ]
                },
                "folder": {
                    "type": "string",
                    "description": "Target folder name; defaults to the configured folder"
                },
                "dry_run": {
                    "type": "boolean",
                    "description": "Preview without issuing any mutating call"
                }
            },
            "required": ["action", "guids"]
        }))
        .category(ToolCategory::Write)
        .build(manage_subscriptions_handler)
}

async fn manage_subscriptions_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let params: ManageSubscriptionsParams =
        serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let result = match orchestrator(&ctx)
        .manage_subscriptions(
            &params.action,
            &params.guids,
            params.folder.as_deref(),
            params.dry_run,
        )
        .await
    {
        Ok(outcome) => serde_json::to_value(&outcome)
            .map_err(|e| McpError::InternalError(e.to_string()))?,
        Err(e) => super::error_payload(&e),
    };
    ToolsCallResult::json(&result).map_err(|e| McpError::InternalError(e.to_string()))
}

// ============================================================================
// company.request
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompanyRequestParams {
    domain: String,
    company_name: Option<String>,
    folder: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

fn company_request_tool() -> RegisteredTool {
    ToolBuilder::new("company.request")
        .description(
            "Request onboarding of a company not yet covered by the ratings service, by domain. \
             Reports existing pending requests instead of duplicating them.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "domain": {
                    "type": "string",
                    "description": "Primary domain of the company to onboard"
                },
                "company_name": {
                    "type": "string",
                    "description": "Optional company name to attach to the request"
                },
                "folder": {
                    "type": "string",
                    "description": "Existing folder to file the company under; defaults to the configured folder"
                },
                "dry_run": {
                    "type": "boolean",
                    "description": "Preview the submission without sending it"
                }
            },
            "required": ["domain"]
        }))
        .category(ToolCategory::Write)
        .build(company_request_handler)
}

async fn company_request_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let params: CompanyRequestParams =
        serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let result = match orchestrator(&ctx)
        .request_company(
            &params.domain,
            params.company_name.as_deref(),
            params.folder.as_deref(),
            params.dry_run,
        )
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => super::error_payload(&e),
    };
    ToolsCallResult::json(&result).map_err(|e| McpError::InternalError(e.to_string()))
}
