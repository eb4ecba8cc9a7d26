use std::path::PathBuf;

use clap::{Parser, Subcommand};
use implink_metrics::{MetricsRecorderConfig, init_metrics};
use implink_server::{config, server, state};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "implink", about = "implink — bidirectional messaging gateway router")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Path to the config file (overrides discovery).
    #[arg(long, global = true, env = "IMPLINK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start both direction listeners (default when no subcommand given).
    Serve,
    /// Load the configured profile store, run one refresh tick per
    /// direction, and print a summary without starting the server.
    Doctor,
}

fn init_telemetry(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "implink starting");

    let app_config = config::discover_and_load(cli.config.as_deref());
    let store = state::build_profile_store(&app_config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let metrics_handle = if app_config.metrics_enabled {
                Some(init_metrics(MetricsRecorderConfig { enabled: true })?)
            } else {
                None
            };
            if let Err(e) = server::run(app_config, store, metrics_handle).await {
                tracing::error!(error = %e, "fatal error, exiting");
                std::process::exit(1);
            }
            Ok(())
        },
        Commands::Doctor => server::doctor(app_config, store).await,
    }
}
