//! Document indexing command.

use clap::Args;
use std::path::PathBuf;
use tif_core::{config::AppConfig, AppError, AppResult};
use tif_knowledge::{config as base_config, KnowledgeBaseConfig, LearnOptions};

/// Index district report documents
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Directory (or file) to index (default: knowledge.documentsDir)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Substring a path must contain to be indexed
    #[arg(long)]
    pub include: Vec<String>,

    /// Substring that excludes a path
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Drop the existing index before indexing
    #[arg(long)]
    pub reset: bool,

    /// Empty the index and exit without indexing
    #[arg(long, conflicts_with = "reset")]
    pub clean: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let base = &config.knowledge.base;
        tracing::info!("Executing index command for base '{}'", base);

        if self.clean {
            tif_knowledge::clean(&config.workspace, base)?;
            println!("Emptied document base '{}'", base);
            return Ok(());
        }

        if !base_config::get_config_path(&config.workspace, base).exists() {
            let seeded = seed_base_config(config);
            tracing::info!(
                "Creating document base '{}' ({} / {})",
                base,
                seeded.provider,
                seeded.model
            );
            base_config::save_config(&config.workspace, &seeded)?;
        }

        let base_cfg = base_config::load_config(&config.workspace, base)?;
        let api_key = config.resolve_api_key(&base_cfg.provider);

        let options = LearnOptions {
            base_name: base.clone(),
            paths: vec![self.dir.clone().unwrap_or_else(|| config.documents_dir())],
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            reset: self.reset,
        };

        let stats = tif_knowledge::learn(&config.workspace, options, api_key.as_deref()).await?;

        if self.json {
            let output = serde_json::json!({
                "base": base,
                "sourcesCount": stats.sources_count,
                "chunksCount": stats.chunks_count,
                "skippedCount": stats.skipped_count,
                "bytesProcessed": stats.bytes_processed,
                "durationSecs": stats.duration_secs,
            });
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!(
                "Indexed {} documents ({} chunks, {} bytes, {} skipped) in {:.2}s",
                stats.sources_count,
                stats.chunks_count,
                stats.bytes_processed,
                stats.skipped_count,
                stats.duration_secs
            );

            let base_stats = tif_knowledge::stats(&config.workspace, base)?;
            println!(
                "Base '{}' now holds {} documents ({} chunks, {} bytes on disk)",
                base_stats.base_name,
                base_stats.sources_count,
                base_stats.chunks_count,
                base_stats.db_size_bytes
            );
        }

        Ok(())
    }
}

/// Base config for a first index run, following the active provider.
fn seed_base_config(config: &AppConfig) -> KnowledgeBaseConfig {
    let model = config
        .resolve_embedding_model()
        .unwrap_or_else(|| default_embedding_model(&config.provider).to_string());

    KnowledgeBaseConfig {
        name: config.knowledge.base.clone(),
        provider: config.provider.clone(),
        model,
        endpoint: config.resolve_endpoint(),
        ..Default::default()
    }
}

fn default_embedding_model(provider: &str) -> &'static str {
    match provider {
        "ollama" => "nomic-embed-text",
        _ => "text-embedding-3-small",
    }
}
