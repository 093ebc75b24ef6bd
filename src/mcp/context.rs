//! Shared context handed to tool and resource handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::ratings_api::RatingsApi;

/// Context available to every tool/resource invocation.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Arc<AppConfig>,
    pub api: Arc<dyn RatingsApi>,
    pub server_version: String,
    pub start_time: Instant,
}

impl ToolContext {
    pub fn new(config: Arc<AppConfig>, api: Arc<dyn RatingsApi>, server_version: &str) -> Self {
        Self {
            config,
            api,
            server_version: server_version.to_string(),
            start_time: Instant::now(),
        }
    }
}
