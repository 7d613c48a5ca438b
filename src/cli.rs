//! Command-line interface for the city registry.

use clap::{Parser, Subcommand};

/// City registry - alliance-aware city CRUD service
#[derive(Parser, Debug)]
#[command(name = "city_registry")]
#[command(about = "City registry with alliance tracking", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the REST API server
    Serve {
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Path to the database file (created if it doesn't exist).
        /// Falls back to DATABASE_URL, then to "city_registry.db".
        #[arg(long)]
        db_path: Option<String>,
    },
}
