//! Init command handler.

use clap::Args;
use docent_core::{config::AppConfig, AppResult};
use docent_knowledge::services::init_collection;

/// Create the configured collection
#[derive(Args, Debug)]
pub struct InitCommand {}

impl InitCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let collection = config.collection_name()?;
        tracing::info!("Executing init command for collection '{}'", collection);

        config.ensure_docent_dir()?;

        if init_collection(config).await? {
            println!(
                "Created collection '{}' ({} dimensions, {})",
                collection,
                config.index.vector_dimension,
                config.index.distance.as_str()
            );
        } else {
            println!("Collection '{}' already exists", collection);
        }

        Ok(())
    }
}
