//! Guepard MCP server - stdio entry point.
//!
//! Usage:
//!     guepard-mcp
//!     guepard-mcp --profile read_only
//!     guepard-mcp --disabled-modules users,tokens --state-path ~/.guepard/subs.json
//!
//! Flags layer on top of the environment (`GUEPARD_PROFILE`,
//! `GUEPARD_ENABLED_MODULES`, `ACCESS_TOKEN`, ...).

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use guepard_mcp::api::ApiClient;
use guepard_mcp::mcp::{McpServer, ToolExecutor};
use guepard_mcp::subscriptions::{LocalGateway, StateStore, SubscriptionManager};
use guepard_mcp::tools::{builtin_registry, ActivationInputs, ActivationProfile, PolicyHandle};
use guepard_mcp::types::parse_duration;
use guepard_mcp::Config;

#[derive(Parser, Debug, Clone)]
#[command(name = "guepard-mcp")]
#[command(about = "Guepard MCP server over stdio")]
#[command(version)]
struct Cli {
    /// Activation profile (minimal, read_only, production, development, monitoring)
    #[arg(long)]
    profile: Option<ActivationProfile>,

    /// Comma-separated modules to enable
    #[arg(long, value_delimiter = ',')]
    enabled_modules: Vec<String>,

    /// Comma-separated tools to enable
    #[arg(long, value_delimiter = ',')]
    enabled_tools: Vec<String>,

    /// Comma-separated modules to disable
    #[arg(long, value_delimiter = ',')]
    disabled_modules: Vec<String>,

    /// Comma-separated tools to disable
    #[arg(long, value_delimiter = ',')]
    disabled_tools: Vec<String>,

    /// Platform API base URL
    #[arg(long, env = "GUEPARD_API_URL")]
    api_url: Option<String>,

    /// Gateway call deadline, e.g. "5s" or "1500ms"
    #[arg(long, env = "GUEPARD_GATEWAY_TIMEOUT")]
    gateway_timeout: Option<String>,

    /// File to persist subscription state in
    #[arg(long, env = "GUEPARD_SUBSCRIPTION_STATE")]
    state_path: Option<PathBuf>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Environment inputs with flag values layered on top.
    fn activation_inputs(&self) -> guepard_mcp::Result<ActivationInputs> {
        let mut inputs = ActivationInputs::from_env()?;
        if let Some(profile) = self.profile {
            inputs = inputs.with_profile(profile);
        }
        Ok(inputs
            .enable_modules(trimmed(&self.enabled_modules))
            .enable_tools(trimmed(&self.enabled_tools))
            .disable_modules(trimmed(&self.disabled_modules))
            .disable_tools(trimmed(&self.disabled_tools)))
    }

    fn config(&self) -> guepard_mcp::Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(url) = &self.api_url {
            config.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = &self.gateway_timeout {
            config.subscriptions.gateway_timeout = parse_duration(raw)?;
        }
        if let Some(path) = &self.state_path {
            config.subscriptions.state_path = Some(path.clone());
        }
        if self.json_logs {
            config.observability.json_logs = true;
        }
        Ok(config)
    }
}

fn trimmed(values: &[String]) -> impl Iterator<Item = String> + '_ {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.config()?;

    // Initialize observability
    guepard_mcp::observability::init_tracing(&config.observability);

    // Resolve the activation policy; a bad name aborts startup
    let registry = Arc::new(builtin_registry()?);
    let policy = PolicyHandle::new(Arc::clone(&registry), &cli.activation_inputs()?)?;

    let api = Arc::new(ApiClient::new(&config.api)?);
    let mut subscriptions =
        SubscriptionManager::new(Arc::clone(&registry), Arc::new(LocalGateway), api.clone())
            .with_call_timeout(config.subscriptions.gateway_timeout);
    if let Some(path) = &config.subscriptions.state_path {
        subscriptions = subscriptions.with_store(StateStore::new(path.clone())).await?;
    }

    let reload_cli = cli.clone();
    let executor = ToolExecutor::new(policy, Arc::new(subscriptions), api)
        .with_activation_source(move || reload_cli.activation_inputs());

    let server = Arc::new(McpServer::new(Arc::new(executor), config.mcp.clone()));

    tracing::info!("🚀 Guepard MCP server starting on stdio");
    tracing::info!("  ✓ API: {}", config.api.base_url);
    if config.api.access_token.is_none() {
        tracing::warn!("ACCESS_TOKEN is not set; platform calls will be rejected");
    }

    let signal_server = Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            signal_server.shutdown();
        }
    });

    server.serve_stdio().await?;
    tracing::info!("Guepard MCP server stopped");

    // A pending blocking stdin read would otherwise hold the runtime open.
    std::process::exit(0)
}
