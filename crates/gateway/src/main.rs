use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gateway::config::{GatewayConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "gateway")]
#[command(about = "Webhook ingestion and secret management gateway")]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long)]
    config: Option<String>,

    /// Overrides the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => GatewayConfig::load_from(path)?,
        None => GatewayConfig::load()?,
    };
    if let Some(bind) = cli.bind {
        config.bind_address = Some(bind);
    }

    init_tracing(&config);
    gateway::gateway::run(&config).await
}

fn init_tracing(config: &GatewayConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
