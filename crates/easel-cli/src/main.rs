//! Command-line entry point for the easel MCP server.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "easel", version, about = "MCP server for DashScope image generation and read-only Postgres inspection")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the MCP server (stdio or HTTP transport).
    Serve(commands::serve::ServeArgs),

    /// List the tools, resources and prompts the server exposes.
    Tools(commands::tools::ToolsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays a clean protocol channel under
    // the stdio transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve(args) => commands::serve::execute(args).await,
        Command::Tools(args) => commands::tools::execute(args).await,
    }
}
