pub mod export;
pub mod migrate;
pub mod serve;

pub use export::{ExportCommands, handle_export_command};
pub use migrate::{MigrateCommands, handle_migrate_command};
pub use serve::{ServeCommands, handle_serve_command};
