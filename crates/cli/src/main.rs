mod commands;
mod logging;

use clap::{Parser, Subcommand};
use commands::{migrate, Context};
use std::path::PathBuf;
use std::process::ExitCode;
use strata_orm::MigrationAction;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Schema migrations for strata applications", version)]
struct Cli {
    /// Configuration directory
    #[arg(long, global = true, default_value = "config")]
    config: PathBuf,

    /// Environment overlay (development, testing, production); defaults to STRATA_ENV
    #[arg(long, global = true)]
    env: Option<String>,

    /// Connection name from database.connections; defaults to database.default
    #[arg(long, global = true)]
    connection: Option<String>,

    /// Diagnostics level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit diagnostics as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration management
    Migrate {
        #[command(subcommand)]
        migrate_command: MigrateCommands,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Apply pending migrations
    #[command(alias = "apply")]
    Up {
        /// Record successes in one insert after the run
        #[arg(long)]
        batch: bool,
    },

    /// Reverse migrations
    #[command(aliases = ["reverse", "rollback"])]
    Down {
        /// Record successes in one insert after the run
        #[arg(long)]
        batch: bool,
    },

    /// Run seeders
    Seed {
        /// Record successes in one insert after the run
        #[arg(long)]
        batch: bool,
    },

    /// Show recorded actions per migration
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new SQL migration
    Create {
        /// Migration name
        name: String,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::load(&cli.config, cli.env.as_deref(), cli.connection.as_deref())?;

    match cli.command {
        Commands::Migrate { migrate_command } => match migrate_command {
            MigrateCommands::Up { batch } => {
                migrate::run(&ctx, MigrationAction::Apply, batch).await?;
            }
            MigrateCommands::Down { batch } => {
                migrate::run(&ctx, MigrationAction::Reverse, batch).await?;
            }
            MigrateCommands::Seed { batch } => {
                migrate::run(&ctx, MigrationAction::Seed, batch).await?;
            }
            MigrateCommands::Status { json } => {
                migrate::status(&ctx, json).await?;
            }
            MigrateCommands::Create { name } => {
                migrate::create(&ctx, &name)?;
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(&cli.log_level, cli.log_json) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
