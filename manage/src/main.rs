mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::Manage;
use dialoguer::Input;
use fm_database::settings::CONFIG_ENV_VAR;
use fm_database::{get_config, Database, MigrationTool};
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Farm monitor database management.
#[derive(Debug, Parser)]
#[command(name = "fm-manage", version, about)]
struct Cli {
    /// Configuration to use: dev, test or prod
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create database tables and stamp the newest migration
    CreateTables,
    /// Drop all database tables
    DropTables,
    /// Drop and recreate database tables
    RecreateDatabase,
    /// Delete all data from the database
    DeleteAllData {
        /// Confirm this action. This will delete all previous database data.
        #[arg(long)]
        confirm: bool,
    },
    /// Create the admin user and the system setup record
    Init,
    /// Create a new migration revision
    CreateRevision {
        /// Message for the revision
        #[arg(long)]
        message: Option<String>,
    },
    /// Upgrade the database to a revision
    DatabaseUpgrade {
        /// Revision to upgrade to
        #[arg(long)]
        revision: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = get_config(cli.config.as_deref());
    info!("Using {} configuration", config.env.as_str());

    let db = Database::connect(&config).await?;
    let manage = Manage::new(db, MigrationTool::from_config(&config));
    let mut out = io::stdout();

    let result = match cli.command {
        Commands::CreateTables => manage.create_tables(&mut out).await,
        Commands::DropTables => manage.drop_tables(&mut out).await,
        Commands::RecreateDatabase => manage.recreate_database(&mut out).await,
        Commands::DeleteAllData { confirm } => manage.delete_all_data(confirm, &mut out).await,
        Commands::Init => manage.init(&mut out).await,
        Commands::CreateRevision { message } => {
            let message = match message {
                Some(message) => message,
                None => Input::new()
                    .with_prompt("Provide a message for the revision")
                    .interact_text()?,
            };
            manage.create_revision(&message, &mut out).await
        }
        Commands::DatabaseUpgrade { revision } => {
            let revision = match revision {
                Some(revision) => revision,
                None => Input::new()
                    .with_prompt("What revision to upgrade to?")
                    .default("head".to_string())
                    .interact_text()?,
            };
            manage.database_upgrade(&revision, &mut out).await
        }
    };

    manage.database().close().await;
    result
}
