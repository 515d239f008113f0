//! Streamgate CLI - Command-line interface
//!
//! Provides command-line access to the streaming server and token helpers.

mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "streamgate")]
#[command(about = "A chat-storage media streaming gateway")]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    commands::handle_command(cli.command).await?;

    Ok(())
}
