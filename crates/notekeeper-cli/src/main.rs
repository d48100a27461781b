//! notekeeper - a command-line client for the notes service.
//!
//! Logs in once, keeps the session on disk, and refreshes the token
//! transparently when the server rejects it.

mod commands;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "notekeeper", version, about = "Take notes from the terminal")]
pub struct Cli {
    /// Print raw JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: Option<String>,
    },
    /// Log in with an existing account
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Show the logged in user
    Whoami,
    /// List notes, most recently updated first
    List,
    /// Show one note
    Show { id: String },
    /// Create a note
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Replace a note's title and content
    Edit {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Delete a note
    Rm { id: String },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    info!(command = ?cli.command, "notekeeper starting");

    commands::run(cli).await
}
