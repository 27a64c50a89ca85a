use super::commands::{ExportCommands, MigrateCommands, ServeCommands};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "patient-survey")]
#[command(about = "Patient satisfaction survey service", version)]
pub struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeCommands),
    /// Write a survey's responses to an xlsx file
    Export(ExportCommands),
    /// Inspect or change the database schema version
    Migrate(MigrateCommands),
}
