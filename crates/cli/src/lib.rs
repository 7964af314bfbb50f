//! Crabwire CLI

use clap::{Parser, Subcommand};
use provider::catalog;
use tracing_subscriber::{EnvFilter, fmt};
pub use {chat::ChatCmd, config::Config};

mod chat;
mod config;
mod tools;

/// Crabwire CLI
#[derive(Debug, Parser)]
#[command(name = "crabwire", version, about)]
pub struct App {
    /// Verbosity level (use -v, -vv, -vvv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chat with a provider
    Chat(chat::ChatCmd),

    /// List the supported providers
    Providers,

    /// Generate the configuration file
    Generate,
}

impl App {
    /// Initialize tracing subscriber based on verbosity
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directive = match self.verbose {
                0 => "warn",
                1 => "crabwire_provider=debug,crabwire_session=debug",
                2 => "crabwire_provider=trace,crabwire_session=trace",
                3 => "debug",
                _ => "trace",
            };
            EnvFilter::new(directive)
        });

        fmt()
            .without_time()
            .with_env_filter(filter)
            .with_target(self.verbose != 0)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Print the catalog with the readiness of each provider.
pub fn list_providers(config: &Config) {
    for profile in catalog::all() {
        let credentials = config.credentials(profile.name);
        let model = profile
            .default_model()
            .map(|model| model.name)
            .unwrap_or("-");
        let ready = if profile.is_ready(&credentials) {
            "ready"
        } else {
            "missing credentials"
        };
        let active = if config.conversation.provider.eq_ignore_ascii_case(profile.name) {
            "*"
        } else {
            " "
        };
        println!("{active} {:<12} {model:<24} {ready}", profile.name);
    }
}
