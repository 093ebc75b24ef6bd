use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pagella_server::config;
use pagella_server::mcp::resources::register_all_resources;
use pagella_server::mcp::tools::register_all_tools;
use pagella_server::mcp::{McpRegistry, McpServer, ToolContext};
use pagella_server::ratings_api::{HttpRatingsApi, RatingsApi};

const SERVER_NAME: &str = "pagella-server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Ratings API key. Can also come from the config file or PAGELLA_API_KEY.
    #[clap(long)]
    pub api_key: Option<String>,

    /// Base URL of the ratings API.
    #[clap(long)]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[clap(long)]
    pub timeout_secs: Option<u64>,

    /// Accept invalid TLS certificates (testing against self-signed endpoints).
    #[clap(long)]
    pub allow_insecure_tls: bool,

    /// Path to a custom CA bundle in PEM format.
    #[clap(long)]
    pub ca_bundle_path: Option<String>,

    /// Folder that new subscriptions are filed under.
    #[clap(long)]
    pub default_folder: Option<String>,

    /// Subscription type used when subscribing.
    #[clap(long)]
    pub default_subscription_type: Option<String>,

    /// Maximum number of findings attached to a rating.
    #[clap(long)]
    pub max_findings: Option<usize>,

    /// Tool-surface profile: "standard" or "risk_manager".
    #[clap(long)]
    pub context: Option<String>,

    /// Skip the startup connectivity check.
    #[clap(long)]
    pub skip_startup_checks: bool,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            api_key: args.api_key.clone(),
            base_url: args.base_url.clone(),
            timeout_secs: args.timeout_secs,
            allow_insecure_tls: args.allow_insecure_tls,
            ca_bundle_path: args.ca_bundle_path.clone(),
            default_folder: args.default_folder.clone(),
            default_subscription_type: args.default_subscription_type.clone(),
            max_findings: args.max_findings,
            context: args.context.clone(),
            skip_startup_checks: args.skip_startup_checks,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    // stdout carries the JSON-RPC stream, so logs go to stderr.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  base_url: {}", app_config.api.base_url);
    info!("  context: {}", app_config.context.as_str());
    info!("  max_findings: {}", app_config.findings.max_findings);

    let api: Arc<dyn RatingsApi> = Arc::new(HttpRatingsApi::new(&app_config.api)?);

    if app_config.skip_startup_checks {
        info!("Skipping startup connectivity check");
    } else {
        match api.current_user().await {
            Ok(account) => info!(
                "Connected to ratings API as {}",
                account.email.or(account.name).unwrap_or_else(|| "unknown account".to_string())
            ),
            Err(e) => {
                error!("Startup connectivity check failed: {}", e);
                anyhow::bail!("Cannot reach the ratings API with the configured credentials: {}", e);
            }
        }
    }

    let mut registry = McpRegistry::new();
    register_all_tools(&mut registry, app_config.context);
    register_all_resources(&mut registry);

    let context = ToolContext::new(Arc::new(app_config), api, SERVER_VERSION);
    let mut server = McpServer::new(Arc::new(registry), context, SERVER_NAME);

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received ctrl-c, shutting down");
            signal_token.cancel();
        }
    });

    tokio::select! {
        result = server.serve_stdio(cancel_token.clone()) => {
            if let Err(e) = result {
                error!("Serve loop failed: {}", e);
                return Err(e);
            }
        }
        _ = cancel_token.cancelled() => {}
    }

    info!("Server stopped");
    Ok(())
}
