//! Bocado CLI - Database migrations and feature flag management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bocado migrate
//!
//! # Inspect flags (optionally for one user)
//! bocado flags show --user 5f0c...
//!
//! # Override a flag globally or for one user
//! bocado flags set mealPlanner true
//! bocado flags unset --user 5f0c... mealPlanner
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `flags show|set|unset` - Manage feature flag overrides

#![cfg_attr(not(test), forbid(unsafe_code))]

use bocado_core::{FeatureFlag, UserId};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bocado")]
#[command(author, version, about = "Bocado CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage feature flag overrides
    Flags {
        #[command(subcommand)]
        action: FlagAction,
    },
}

#[derive(Subcommand)]
enum FlagAction {
    /// Show layers and resolved values
    Show {
        /// User whose layer to include
        #[arg(short, long)]
        user: Option<UserId>,
    },
    /// Set an override
    Set {
        /// User layer to write (Global if omitted)
        #[arg(short, long)]
        user: Option<UserId>,

        /// Flag name, e.g. `pantryV2`
        flag: FeatureFlag,

        /// `true` or `false`
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Remove an override
    Unset {
        /// User layer to write (Global if omitted)
        #[arg(short, long)]
        user: Option<UserId>,

        /// Flag name, e.g. `pantryV2`
        flag: FeatureFlag,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Flags { action } => match action {
            FlagAction::Show { user } => commands::flags::show(user).await?,
            FlagAction::Set { user, flag, value } => {
                commands::flags::set(user, flag, value).await?;
            }
            FlagAction::Unset { user, flag } => commands::flags::unset(user, flag).await?,
        },
    }
    Ok(())
}
