use clap::{Parser, Subcommand};

/// Command-line interface for the BPSR crowd data service
#[derive(Parser, Debug)]
#[command(
    name = "bpsr-crowd-data",
    version = env!("CARGO_PKG_VERSION"),
    about = "Community data ingestion API for Blue Protocol: Star Resonance",
    long_about = None
)]
pub struct Cli {
    /// Override DATABASE_URL
    #[arg(global = true, long = "database-url")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Apply database migrations and exit
    Migrate,

    /// Insert an API key into the api_keys table
    SeedKey {
        /// API key value (8-256 characters, no whitespace)
        key: String,

        #[arg(long = "label", default_value = "seeded")]
        label: String,
    },
}

impl Cli {
    /// Subcommand to run, `serve` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}
