//! Adopta CLI - animal adoption listings in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{auth, config, post, profile};

/// Adopta - animal adoption listings in your terminal
#[derive(Parser)]
#[command(name = "adopta", version, about, long_about = None)]
struct Cli {
    /// Output as JSON ({success, data, error, context})
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup {
        /// Account email
        email: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Contact phone
        #[arg(long)]
        phone: Option<String>,
        /// Password (prompted when omitted)
        #[arg(long, env = "ADOPTA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign in with email and password
    Login {
        /// Account email
        email: String,
        /// Password (prompted when omitted)
        #[arg(long, env = "ADOPTA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and forget the cached session
    Logout,

    /// Show the current session
    Whoami,

    /// Update the signed-in user's profile
    Profile {
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New contact phone
        #[arg(long)]
        phone: Option<String>,
    },

    /// Manage adoption listings
    Post {
        #[command(subcommand)]
        command: post::PostCommands,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<output::Reported>() => ExitCode::FAILURE,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr, filtered by `ADOPTA_LOG` (default `warn`)
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ADOPTA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Signup { email, name, phone, password } => {
            auth::signup(email, name, phone, password, json).await
        }
        Commands::Login { email, password } => auth::login(&email, password, json).await,
        Commands::Logout => auth::logout(json).await,
        Commands::Whoami => auth::whoami(json).await,
        Commands::Profile { name, phone } => profile::run(name, phone, json).await,
        Commands::Post { command } => post::run(command, json).await,
        Commands::Config { command } => config::run(command, json),
    }
}
