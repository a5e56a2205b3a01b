//! CLI entry point for caido-mcp.

pub mod auth;

use clap::{Parser, Subcommand};

use crate::config::ENV_URL;

/// Caido authentication CLI
#[derive(Parser, Debug)]
#[command(name = "caido-mcp", version, about = "Authenticate against a Caido instance")]
pub struct Cli {
    /// Caido instance URL (e.g. http://localhost:8080)
    #[arg(short = 'u', long, global = true, env = ENV_URL)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in through the device flow and store the token
    Login(LoginArgs),
    /// Print a valid access token to stdout, refreshing it if needed
    Token,
    /// Show the stored token and its expiry
    Status,
    /// Delete the stored token
    Logout,
}

/// Arguments for `caido-mcp login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Seconds to wait for the browser approval
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print the verification URL without opening a browser
    #[arg(long)]
    pub no_browser: bool,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
