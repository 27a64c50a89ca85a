use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;

use crate::config::Settings;
use crate::export::ResponseExporter;
use crate::model::DateRange;
use crate::storage::Storage;

#[derive(Args)]
pub struct ExportCommands {
    /// Survey id
    pub survey_id: String,
    /// First submission date to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last submission date to include (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Output file or directory (defaults to the generated name in the
    /// current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_export_command(cmd: ExportCommands, settings: Settings) -> Result<()> {
    let storage = Storage::open(&settings.database_path()?).await?;
    let exporter = ResponseExporter::new(storage, settings.export_options()?, settings.retry_policy());

    let range = DateRange::new(cmd.from, cmd.to);
    let output = exporter
        .export(&cmd.survey_id, &range)
        .await?
        .with_context(|| format!("Survey '{}' not found", cmd.survey_id))?;

    let path = match cmd.output {
        Some(path) if path.is_dir() => path.join(&output.filename),
        Some(path) => path,
        None => PathBuf::from(&output.filename),
    };

    std::fs::write(&path, &output.bytes).with_context(|| format!("Failed to write {:?}", path))?;

    println!(
        "Exported {} response(s) to {}",
        output.stats.total_responses,
        path.display()
    );
    Ok(())
}
