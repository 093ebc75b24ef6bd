mod file_config;

pub use file_config::{
    ApiFileConfig, FileConfig, FindingsFileConfig, SubscriptionsFileConfig,
};

use anyhow::{bail, Result};

/// Environment variable that can supply the API key.
pub const API_KEY_ENV: &str = "PAGELLA_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_FINDINGS: usize = 10;

/// Default risk-vector filter for the findings fetch.
pub const DEFAULT_RISK_VECTORS: [&str; 9] = [
    "botnet_infections",
    "spam_propagation",
    "malware_servers",
    "unsolicited_comm",
    "potentially_exploited",
    "open_ports",
    "patching_cadence",
    "insecure_systems",
    "server_software",
];

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub allow_insecure_tls: bool,
    pub ca_bundle_path: Option<String>,
    pub default_folder: Option<String>,
    pub default_subscription_type: Option<String>,
    pub max_findings: Option<usize>,
    pub context: Option<String>,
    pub skip_startup_checks: bool,
}

/// Tool-surface profile. `RiskManager` additionally registers the
/// subscription-management and onboarding tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerContext {
    Standard,
    RiskManager,
}

impl ServerContext {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "standard" => Ok(ServerContext::Standard),
            "risk_manager" => Ok(ServerContext::RiskManager),
            other => bail!("Unknown context '{}'; expected 'standard' or 'risk_manager'", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerContext::Standard => "standard",
            ServerContext::RiskManager => "risk_manager",
        }
    }
}

/// Settings for the HTTP ratings client.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub allow_insecure_tls: bool,
    pub ca_bundle_path: Option<String>,
}

/// Settings for subscription placement.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSettings {
    pub default_folder: Option<String>,
    pub default_subscription_type: Option<String>,
}

/// Settings for findings retrieval and ranking.
#[derive(Debug, Clone)]
pub struct FindingsSettings {
    pub max_findings: usize,
    pub risk_vector_filter: Vec<String>,
}

impl Default for FindingsSettings {
    fn default() -> Self {
        Self {
            max_findings: DEFAULT_MAX_FINDINGS,
            risk_vector_filter: DEFAULT_RISK_VECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub subscriptions: SubscriptionSettings,
    pub findings: FindingsSettings,
    pub context: ServerContext,
    pub skip_startup_checks: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let api_file = file.api.unwrap_or_default();
        let subs_file = file.subscriptions.unwrap_or_default();
        let findings_file = file.findings.unwrap_or_default();

        let api_key = api_file
            .api_key
            .or_else(|| cli.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty());
        let api_key = match api_key {
            Some(key) => key,
            None => bail!(
                "API key must be specified via config file, --api-key, or the {} env var",
                API_KEY_ENV
            ),
        };

        let base_url = api_file
            .base_url
            .or_else(|| cli.base_url.clone())
            .filter(|u| !u.trim().is_empty());
        let base_url = match base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => bail!("API base URL must be specified via config file or --base-url"),
        };

        let timeout_secs = api_file
            .timeout_secs
            .or(cli.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }

        let api = ApiSettings {
            api_key,
            base_url,
            timeout_secs,
            allow_insecure_tls: api_file.allow_insecure_tls.unwrap_or(cli.allow_insecure_tls),
            ca_bundle_path: api_file.ca_bundle_path.or_else(|| cli.ca_bundle_path.clone()),
        };

        let subscriptions = SubscriptionSettings {
            default_folder: subs_file
                .default_folder
                .or_else(|| cli.default_folder.clone())
                .filter(|f| !f.trim().is_empty()),
            default_subscription_type: subs_file
                .default_subscription_type
                .or_else(|| cli.default_subscription_type.clone())
                .filter(|t| !t.trim().is_empty()),
        };

        let max_findings = findings_file
            .max_findings
            .or(cli.max_findings)
            .unwrap_or(DEFAULT_MAX_FINDINGS);
        if max_findings == 0 {
            bail!("max_findings must be greater than zero");
        }
        let findings = FindingsSettings {
            max_findings,
            risk_vector_filter: findings_file
                .risk_vector_filter
                .unwrap_or_else(|| DEFAULT_RISK_VECTORS.iter().map(|s| s.to_string()).collect()),
        };

        let context = match file.context.or_else(|| cli.context.clone()) {
            Some(raw) => ServerContext::parse(&raw)?,
            None => ServerContext::Standard,
        };

        // The risk-manager surface registers subscribing tools, which need a
        // resolved placement target; fail at startup rather than per call.
        if context == ServerContext::RiskManager {
            if subscriptions.default_folder.is_none() {
                bail!("context 'risk_manager' requires [subscriptions].default_folder");
            }
            if subscriptions.default_subscription_type.is_none() {
                bail!("context 'risk_manager' requires [subscriptions].default_subscription_type");
            }
        }

        Ok(Self {
            api,
            subscriptions,
            findings,
            context,
            skip_startup_checks: file.skip_startup_checks.unwrap_or(cli.skip_startup_checks),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli_with_required() -> CliConfig {
        CliConfig {
            api_key: Some("key".to_string()),
            base_url: Some("https://ratings.example/api".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&cli_with_required(), None).unwrap();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.findings.max_findings, 10);
        assert_eq!(config.findings.risk_vector_filter.len(), 9);
        assert_eq!(config.context, ServerContext::Standard);
        assert!(!config.skip_startup_checks);
        assert!(config.subscriptions.default_folder.is_none());
    }

    #[test]
    fn test_missing_api_key_fails() {
        let cli = CliConfig {
            base_url: Some("https://ratings.example/api".to_string()),
            ..Default::default()
        };
        // Only valid while PAGELLA_API_KEY is unset in the test environment.
        if std::env::var(API_KEY_ENV).is_err() {
            assert!(AppConfig::resolve(&cli, None).is_err());
        }
    }

    #[test]
    fn test_missing_base_url_fails() {
        let cli = CliConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_file_overrides_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "https://file.example/api/"
timeout_secs = 5

[findings]
max_findings = 3
"#
        )
        .unwrap();
        let file_config = FileConfig::load(file.path()).unwrap();

        let mut cli = cli_with_required();
        cli.timeout_secs = Some(60);
        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        // Trailing slash stripped, TOML wins over CLI.
        assert_eq!(config.api.base_url, "https://file.example/api");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.findings.max_findings, 3);
    }

    #[test]
    fn test_zero_max_findings_rejected() {
        let mut cli = cli_with_required();
        cli.max_findings = Some(0);
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_risk_manager_context_requires_subscription_defaults() {
        let mut cli = cli_with_required();
        cli.context = Some("risk_manager".to_string());
        assert!(AppConfig::resolve(&cli, None).is_err());

        cli.default_folder = Some("Vendors".to_string());
        assert!(AppConfig::resolve(&cli, None).is_err());

        cli.default_subscription_type = Some("continuous_monitoring".to_string());
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.context, ServerContext::RiskManager);
    }

    #[test]
    fn test_unknown_context_rejected() {
        let mut cli = cli_with_required();
        cli.context = Some("admin".to_string());
        assert!(AppConfig::resolve(&cli, None).is_err());
    }
}
