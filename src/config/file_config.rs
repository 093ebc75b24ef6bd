//! TOML configuration file schema.
//!
//! Every field is optional; resolution against CLI values and defaults
//! happens in [`super::AppConfig::resolve`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub api: Option<ApiFileConfig>,
    pub subscriptions: Option<SubscriptionsFileConfig>,
    pub findings: Option<FindingsFileConfig>,
    /// Tool-surface profile: "standard" or "risk_manager".
    pub context: Option<String>,
    pub skip_startup_checks: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiFileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub allow_insecure_tls: Option<bool>,
    pub ca_bundle_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionsFileConfig {
    pub default_folder: Option<String>,
    pub default_subscription_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindingsFileConfig {
    pub max_findings: Option<usize>,
    pub risk_vector_filter: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
