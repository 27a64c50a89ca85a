use anyhow::Result;
use clap::Args;

use crate::config::Settings;
use crate::server;
use crate::storage::Storage;

#[derive(Args)]
pub struct ServeCommands {
    /// Override the listen host
    #[arg(long)]
    pub host: Option<String>,
    /// Override the listen port
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn handle_serve_command(cmd: ServeCommands, mut settings: Settings) -> Result<()> {
    if let Some(host) = cmd.host {
        settings.server.host = host;
    }
    if let Some(port) = cmd.port {
        settings.server.port = port;
    }

    let db_path = settings.database_path()?;
    log::info!("Opening database at {:?}", db_path);
    let storage = Storage::open(&db_path).await?;

    server::serve(storage, &settings).await
}
