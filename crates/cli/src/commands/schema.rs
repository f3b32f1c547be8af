//! Schema description command.

use clap::Args;
use tif_core::{config::AppConfig, AppResult};
use tif_data::discover_schema;

/// Print the schema description of the expenditure table
#[derive(Args, Debug)]
pub struct SchemaCommand {}

impl SchemaCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = super::open_store(config)?;
        let schema = discover_schema(&store, &config.data.table)?;

        println!("{}", schema.prompt_context());
        Ok(())
    }
}
