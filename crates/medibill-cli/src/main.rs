//! MediBill CLI - Medical bill appeal analyzer
//!
//! Usage:
//!   medibill serve --port 3000          Start web server
//!   medibill analyze --file bill.pdf    Analyze a bill and print the appeal
//!   medibill prompts --show             Show the analysis prompt

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => commands::cmd_serve(config, &host, port, no_auth, static_dir.as_deref()).await,
        Commands::Analyze {
            file,
            mime,
            json,
            pdf,
        } => {
            commands::cmd_analyze(&config, &file, mime.as_deref(), json, pdf.as_deref()).await
        }
        Commands::Prompts { show } => commands::cmd_prompts(show),
    }
}
