use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::Settings;
use crate::storage::db;
use crate::storage::migrations::Migrator;

#[derive(Args)]
pub struct MigrateCommands {
    #[command(subcommand)]
    pub command: MigrateSubcommands,
}

#[derive(Subcommand)]
pub enum MigrateSubcommands {
    /// Show applied and pending migrations
    Status,
    /// Apply all pending migrations
    Up,
    /// Roll back migrations
    Down {
        /// Version to roll back to (defaults to one step)
        #[arg(long)]
        to: Option<i64>,
    },
}

pub async fn handle_migrate_command(cmd: MigrateCommands, settings: Settings) -> Result<()> {
    let pool = db::connect(&settings.database_path()?).await?;
    let migrator = Migrator::new(&pool)?;

    match cmd.command {
        MigrateSubcommands::Status => {
            print!("{}", migrator.status().await?);
        }
        MigrateSubcommands::Up => {
            let applied = migrator.up().await?;
            println!("Applied {} migration(s)", applied);
        }
        MigrateSubcommands::Down { to } => {
            let reverted = match to {
                Some(version) => migrator.down_to(version).await?,
                None => migrator.step_back().await?,
            };
            println!("Reverted {} migration(s)", reverted);
            print!("{}", migrator.status().await?);
        }
    }

    pool.close().await;
    Ok(())
}
