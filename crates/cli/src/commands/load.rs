//! CSV loading command.

use clap::Args;
use std::path::PathBuf;
use tif_core::{config::AppConfig, AppError, AppResult};
use tif_data::SqliteStore;

/// Load the expenditure CSV into the local database
#[derive(Args, Debug)]
pub struct LoadCommand {
    /// CSV file to load (default: data.csvPath from config)
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

impl LoadCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let csv_path = self.csv.clone().unwrap_or_else(|| config.csv_path());
        tracing::info!("Loading {:?} into table '{}'", csv_path, config.data.table);

        if !csv_path.exists() {
            return Err(AppError::Data(format!("CSV file not found: {:?}", csv_path)));
        }

        let store = SqliteStore::open(&config.database_path())?;
        let stats = store.load_csv(&csv_path, &config.data.table)?;

        println!(
            "Loaded {} rows ({} columns) into '{}'",
            stats.rows, stats.columns, stats.table
        );
        Ok(())
    }
}
