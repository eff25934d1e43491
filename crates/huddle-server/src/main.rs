//! Huddle room presence coordinator.
//!
//! Run with:
//! ```not_rust
//! huddle-server
//! huddle-server --config huddle.toml --port 3000 --http-port 3001
//! PORT=8080 huddle-server --log-level debug
//! ```

use std::path::PathBuf;

use clap::Parser;
use huddle::{HuddleError, HuddleServerBuilder, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "huddle-server")]
#[command(about = "Real-time room presence coordinator", long_about = None)]
struct Args {
    /// TOML config file. Command-line flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host address to bind both listeners to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// WebSocket port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Port for /health, /stats and /rooms/{id}
    #[arg(long)]
    http_port: Option<u16>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Log targets enabled at the default level.
const LOG_TARGETS: &[&str] = &[
    "huddle",
    "huddle_transport",
    "huddle_protocol",
    "huddle_session",
    "huddle_room",
    "huddle_server",
    "tower_http",
];

fn default_directives(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs a `fmt` subscriber. `RUST_LOG` wins over `default_level`.
fn setup_logger(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Replaces the host and/or port of a `host:port` address.
fn override_addr(addr: &str, host: Option<&str>, port: Option<u16>) -> String {
    let (file_host, file_port) = addr.rsplit_once(':').unwrap_or((addr, ""));
    let host = host.unwrap_or(file_host);
    match port {
        Some(port) => format!("{host}:{port}"),
        None => format!("{host}:{file_port}"),
    }
}

fn load_config(args: &Args) -> Result<ServerConfig, HuddleError> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let host = args.host.as_deref();
    config.listen.ws_addr = override_addr(&config.listen.ws_addr, host, args.port);
    config.listen.http_addr = override_addr(&config.listen.http_addr, host, args.http_port);
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received ctrl-c");
}

async fn run(config: ServerConfig) -> Result<(), HuddleError> {
    let server = HuddleServerBuilder::from_config(&config).build().await?;
    server.run_until(shutdown_signal()).await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger(&args.log_level);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
    tracing::info!("server shutdown complete");
}
