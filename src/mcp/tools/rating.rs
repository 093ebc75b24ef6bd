//! Rating Tools
//!
//! The core company-rating tool.

use serde::Deserialize;
use serde_json::Value;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{McpError, ToolsCallResult};
use crate::mcp::registry::{McpRegistry, RegisteredTool, ToolBuilder, ToolCategory, ToolResult};
use crate::rating::RatingOrchestrator;

/// Register rating tools with the registry
pub fn register_tools(registry: &mut McpRegistry) {
    registry.register_tool(company_rating_tool());
}

// ============================================================================
// company.rating
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompanyRatingParams {
    guid: String,
}

fn company_rating_tool() -> RegisteredTool {
    ToolBuilder::new("company.rating")
        .description(
            "Fetch a company's security rating with trends and its top findings, ranked by \
             severity. Creates a temporary subscription when needed and removes it afterwards.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "guid": {
                    "type": "string",
                    "description": "Company guid, as returned by company.search"
                }
            },
            "required": ["guid"]
        }))
        .category(ToolCategory::Read)
        .build(company_rating_handler)
}

async fn company_rating_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let params: CompanyRatingParams =
        serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let orchestrator = RatingOrchestrator::new(
        ctx.api.clone(),
        ctx.config.subscriptions.clone(),
        ctx.config.findings.clone(),
    );
    let result = match orchestrator.get_company_rating(&params.guid).await {
        Ok(payload) => serde_json::to_value(&payload)
            .map_err(|e| McpError::InternalError(e.to_string()))?,
        Err(e) => super::error_payload(&e),
    };
    ToolsCallResult::json(&result).map_err(|e| McpError::InternalError(e.to_string()))
}
