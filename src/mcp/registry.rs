//! Tool and resource registry.
//!
//! Tools and resources are built with builders and registered at startup;
//! the server dispatches `tools/call` and `resources/read` through here.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::context::ToolContext;
use super::protocol::{
    McpError, ResourceContent, ResourceDescriptor, ToolDescriptor, ToolsCallResult,
};

pub type ToolResult = Result<ToolsCallResult, McpError>;
pub type ResourceResult = Result<Vec<ResourceContent>, McpError>;

type ToolHandler = Arc<dyn Fn(ToolContext, Value) -> BoxFuture<'static, ToolResult> + Send + Sync>;
type ResourceHandler =
    Arc<dyn Fn(ToolContext, String) -> BoxFuture<'static, ResourceResult> + Send + Sync>;

/// Whether a tool only reads state or can mutate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    Read,
    Write,
}

pub struct RegisteredTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub category: ToolCategory,
    handler: ToolHandler,
}

pub struct ToolBuilder {
    name: String,
    description: String,
    input_schema: Value,
    category: ToolCategory,
}

impl ToolBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            input_schema: serde_json::json!({"type": "object"}),
            category: ToolCategory::Read,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn category(mut self, category: ToolCategory) -> Self {
        self.category = category;
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> RegisteredTool
    where
        F: Fn(ToolContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        RegisteredTool {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema,
            category: self.category,
            handler: Arc::new(move |ctx, params| handler(ctx, params).boxed()),
        }
    }
}

pub struct RegisteredResource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: Option<String>,
    handler: ResourceHandler,
}

pub struct ResourceBuilder {
    uri: String,
    name: String,
    description: String,
    mime_type: Option<String>,
}

impl ResourceBuilder {
    pub fn new(uri: &str, name: &str) -> Self {
        Self {
            uri: uri.to_string(),
            name: name.to_string(),
            description: String::new(),
            mime_type: None,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> RegisteredResource
    where
        F: Fn(ToolContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResourceResult> + Send + 'static,
    {
        RegisteredResource {
            uri: self.uri,
            name: self.name,
            description: self.description,
            mime_type: self.mime_type,
            handler: Arc::new(move |ctx, uri| handler(ctx, uri).boxed()),
        }
    }
}

/// Registry of all tools and resources exposed over the MCP surface.
#[derive(Default)]
pub struct McpRegistry {
    tools: Vec<RegisteredTool>,
    resources: Vec<RegisteredResource>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&mut self, tool: RegisteredTool) {
        self.tools.push(tool);
    }

    pub fn register_resource(&mut self, resource: RegisteredResource) {
        self.resources.push(resource);
    }

    /// Tool descriptors in registration order.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| ToolDescriptor {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        self.resources
            .iter()
            .map(|r| ResourceDescriptor {
                uri: r.uri.clone(),
                name: r.name.clone(),
                description: r.description.clone(),
                mime_type: r.mime_type.clone(),
            })
            .collect()
    }

    pub async fn call_tool(&self, name: &str, ctx: ToolContext, params: Value) -> ToolResult {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| McpError::InvalidParams(format!("unknown tool: {}", name)))?;
        (tool.handler)(ctx, params).await
    }

    pub async fn read_resource(&self, uri: &str, ctx: ToolContext) -> ResourceResult {
        let resource = self
            .resources
            .iter()
            .find(|r| r.uri == uri)
            .ok_or_else(|| McpError::InvalidParams(format!("unknown resource: {}", uri)))?;
        (resource.handler)(ctx, uri.to_string()).await
    }
}
