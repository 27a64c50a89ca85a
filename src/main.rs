use anyhow::Result;
use clap::Parser;
use log::info;

use patient_survey::cli::commands::{handle_export_command, handle_migrate_command, handle_serve_command};
use patient_survey::cli::{Cli, Commands};
use patient_survey::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    info!("Starting patient-survey {}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => handle_serve_command(args, settings).await?,
        Commands::Export(args) => handle_export_command(args, settings).await?,
        Commands::Migrate(args) => handle_migrate_command(args, settings).await?,
    }

    Ok(())
}
