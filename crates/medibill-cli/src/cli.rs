//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MediBill - Turn a medical bill into an appeal
#[derive(Parser)]
#[command(name = "medibill")]
#[command(about = "Medical bill analyzer and appeal letter drafter", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.local/share/medibill/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// Every request then shares a single local session.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Analyze a bill locally and print the results
    Analyze {
        /// Bill to analyze (PDF or image)
        #[arg(short, long)]
        file: PathBuf,

        /// MIME type to declare (sniffed from the file if not specified)
        #[arg(long)]
        mime: Option<String>,

        /// Print the normalized result as JSON
        #[arg(long)]
        json: bool,

        /// Also write the formatted appeal letter to this PDF file
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// List the analysis prompt and its override status
    Prompts {
        /// Print the prompt text as it would be sent today
        #[arg(long)]
        show: bool,
    },
}
