//! Search Tools
//!
//! Company lookup by name or domain.

use serde::Deserialize;
use serde_json::Value;

use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{McpError, ToolsCallResult};
use crate::mcp::registry::{McpRegistry, RegisteredTool, ToolBuilder, ToolCategory, ToolResult};
use crate::rating::RatingOrchestrator;

/// Register search tools with the registry
pub fn register_tools(registry: &mut McpRegistry) {
    registry.register_tool(company_search_tool());
}

// ============================================================================
// company.search
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompanySearchParams {
    name: Option<String>,
    domain: Option<String>,
}

fn company_search_tool() -> RegisteredTool {
    ToolBuilder::new("company.search")
        .description(
            "Search for companies by name or domain. Each result carries the guid needed by \
             company.rating plus a snapshot of its current subscription state.",
        )
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Company name to search for"
                },
                "domain": {
                    "type": "string",
                    "description": "Company primary domain; preferred when known"
                }
            }
        }))
        .category(ToolCategory::Read)
        .build(company_search_handler)
}

async fn company_search_handler(ctx: ToolContext, params: Value) -> ToolResult {
    let params: CompanySearchParams =
        serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let orchestrator = RatingOrchestrator::new(
        ctx.api.clone(),
        ctx.config.subscriptions.clone(),
        ctx.config.findings.clone(),
    );
    let result = match orchestrator
        .search_companies_interactive(params.name.as_deref(), params.domain.as_deref())
        .await
    {
        Ok(response) => serde_json::to_value(&response)
            .map_err(|e| McpError::InternalError(e.to_string()))?,
        Err(e) => super::error_payload(&e),
    };
    ToolsCallResult::json(&result).map_err(|e| McpError::InternalError(e.to_string()))
}
