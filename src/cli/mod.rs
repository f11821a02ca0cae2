use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sqlguard")]
#[command(about = "SQL-injection guard - blocks injection probes before they reach your HTTP application")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "sqlguard.toml")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the guard in front of the configured upstream
    Start {
        /// Override the listen address from the config file
        #[arg(long)]
        listen: Option<String>,
        /// Override the upstream origin from the config file
        #[arg(long)]
        upstream: Option<String>,
    },
    /// Run one request through the guard offline and print the verdict
    Check {
        /// Request path
        #[arg(long, default_value = "/")]
        path: String,
        /// Raw query string (without the leading '?')
        #[arg(long)]
        query: Option<String>,
        /// Request body as text
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,
        /// Read the request body as raw bytes from a file
        #[arg(long)]
        body_file: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the active detection patterns
    Patterns,
    /// Write a default configuration file
    Init,
}
