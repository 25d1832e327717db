//! AATH backchannel — entry point.
//!
//! Starts the embedded AnonCreds test agent and serves the harness's
//! `/agent/command/*` HTTP surface.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use backchannel_server::{api, BackchannelConfig, BackchannelState};

/// AATH AnonCreds backchannel
#[derive(Parser, Debug)]
#[command(name = "aath-backchannel", version, about = "AATH AnonCreds backchannel")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "backchannel.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Handle --init flag
    if args.init {
        let config = BackchannelConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = BackchannelConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.api.port = port;
    }
    config.logging.level = args.log_level;

    tracing::info!("AATH backchannel v{}", env!("CARGO_PKG_VERSION"));

    // Build the shared state and start buffering agent events before the
    // first request can arrive.
    let state = Arc::new(BackchannelState::new(&config));
    state.start();

    let api_addr: SocketAddr =
        format!("{}:{}", config.api.listen_addr, config.api.port).parse()?;

    // Set up graceful shutdown on SIGINT/SIGTERM
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = api::start_api_server(api_addr, state) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    tracing::info!("backchannel exited cleanly");
    Ok(())
}
