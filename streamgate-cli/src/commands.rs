//! CLI command implementations

use std::net::SocketAddr;

use clap::Subcommand;
use streamgate_core::config::StreamgateConfig;
use streamgate_core::gateway::MediaLocator;
use streamgate_core::mode::RuntimeMode;
use streamgate_core::token;
use streamgate_core::tracing_setup::{CliLogLevel, init_tracing};
use streamgate_web::run_server;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming server
    Server {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Runtime mode (development seeds a simulated backend)
        #[arg(long, value_enum, default_value = "development")]
        mode: RuntimeMode,
        /// Number of backend sessions in the pool
        #[arg(long)]
        sessions: Option<usize>,
        /// Console log level
        #[arg(long, value_enum, default_value = "info")]
        log_level: CliLogLevel,
    },
    /// Encode a stream token for a stored item
    Token {
        /// Chat container holding the item
        #[arg(long)]
        container_id: i64,
        /// Item identifier within the container
        #[arg(long)]
        item_id: i64,
        /// Unique-id prefix gating access to the item
        #[arg(long)]
        hash_fragment: String,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Server {
            host,
            port,
            mode,
            sessions,
            log_level,
        } => start_server(host, port, mode, sessions, log_level).await,
        Commands::Token {
            container_id,
            item_id,
            hash_fragment,
        } => encode_token(container_id, item_id, hash_fragment),
    }
}

async fn start_server(
    host: String,
    port: u16,
    mode: RuntimeMode,
    sessions: Option<usize>,
    log_level: CliLogLevel,
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(log_level.as_tracing_level(), None)?;

    let mut config = StreamgateConfig::default();
    if let Some(count) = sessions {
        config.pool.session_count = count;
    }

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    println!("Starting Streamgate in {mode} mode on http://{addr}");

    run_server(config, mode, addr).await
}

fn encode_token(
    container_id: i64,
    item_id: i64,
    hash_fragment: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let locator = MediaLocator {
        container_id,
        item_id,
        hash_fragment,
    };

    let token = token::encode(&locator)?;
    println!("{token}");
    Ok(())
}
