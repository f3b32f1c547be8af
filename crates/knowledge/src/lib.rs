//! Document index for the TIF agent.
//!
//! Parses report documents (PDF, markdown, HTML, text), chunks and embeds
//! them into a local SQLite index, and answers questions over it through
//! [`RagIndex`].

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod parser;
pub mod rag;
pub mod types;

#[cfg(test)]
mod tests;

pub use embeddings::{create_provider, EmbeddingProvider};
pub use rag::{DocumentIndex, RagIndex, RagResponse, RagSourceRef, UnavailableIndex};
pub use types::{
    BaseStats, KnowledgeBaseConfig, KnowledgeChunk, KnowledgeSource, LearnOptions, LearnStats,
};

use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;
use tif_core::{AppError, AppResult};
use walkdir::WalkDir;

/// Index documents into a base.
///
/// Files that cannot be parsed or embedded are logged and counted as
/// skipped. Re-learning a file replaces its previous chunks.
pub async fn learn(
    workspace: &Path,
    options: LearnOptions,
    api_key: Option<&str>,
) -> AppResult<LearnStats> {
    let start = Instant::now();

    tracing::info!("Starting learn operation for base '{}'", options.base_name);

    let config = config::load_config(workspace, &options.base_name)?;
    let provider = create_provider(&config, api_key, None)?;

    let index_path = config::get_index_path(workspace, &options.base_name);
    let conn = index::init_index(&index_path)?;

    if options.reset {
        tracing::info!("Resetting document base '{}'", options.base_name);
        index::reset_index(&conn)?;
    }

    let mut stats = LearnStats {
        sources_count: 0,
        chunks_count: 0,
        skipped_count: 0,
        bytes_processed: 0,
        duration_secs: 0.0,
    };

    for path in &options.paths {
        if !path.exists() {
            return Err(AppError::Knowledge(format!("Path not found: {:?}", path)));
        }

        let files: Vec<_> = if path.is_file() {
            vec![path.clone()]
        } else {
            WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| should_include(p, &options))
                .collect()
        };

        for file in files {
            match process_file(&conn, provider.as_ref(), &config, &file).await {
                Ok((chunks, bytes)) => {
                    stats.sources_count += 1;
                    stats.chunks_count += chunks;
                    stats.bytes_processed += bytes;
                }
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", file, e);
                    stats.skipped_count += 1;
                }
            }
        }
    }

    index::set_last_learn_at(&conn, Utc::now())?;
    config::save_config(workspace, &config)?;

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Learn operation completed: {} sources, {} chunks, {} skipped, {} bytes in {:.2}s",
        stats.sources_count,
        stats.chunks_count,
        stats.skipped_count,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}

/// Parse, chunk, embed and store one file. Returns (chunks, bytes).
async fn process_file(
    conn: &Connection,
    provider: &dyn EmbeddingProvider,
    config: &KnowledgeBaseConfig,
    path: &Path,
) -> AppResult<(u32, u64)> {
    tracing::debug!("Processing file: {:?}", path);

    let text = parser::parse_file(path)?;
    if text.trim().is_empty() {
        return Err(AppError::Knowledge("No extractable text".to_string()));
    }
    let size_bytes = text.len() as u64;

    let source_id = uuid::Uuid::new_v4().to_string();
    let candidates = chunker::chunk_text(
        &source_id,
        path,
        &text,
        config.chunk_size as usize,
        config.chunk_overlap as usize,
    );

    let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let embeddings = provider.embed_batch(&texts).await?;
    if embeddings.len() != candidates.len() {
        return Err(AppError::Knowledge(format!(
            "Expected {} embeddings, got {}",
            candidates.len(),
            embeddings.len()
        )));
    }

    index::remove_source_by_path(conn, path)?;
    index::insert_source(
        conn,
        &KnowledgeSource {
            id: source_id,
            path: path.to_path_buf(),
            content_type: parser::ContentType::from_path(path).as_str().to_string(),
            learned_at: Utc::now(),
            size_bytes,
        },
    )?;

    let mut chunks_count = 0u32;
    for (candidate, embedding) in candidates.into_iter().zip(embeddings) {
        index::insert_chunk(
            conn,
            &KnowledgeChunk {
                id: uuid::Uuid::new_v4().to_string(),
                source_id: candidate.source_id,
                position: candidate.position,
                text: candidate.text,
                embedding: Some(embedding),
                metadata: candidate.metadata,
            },
        )?;
        chunks_count += 1;
    }

    tracing::debug!(
        "Processed {:?}: {} chunks, {} bytes",
        path,
        chunks_count,
        size_bytes
    );

    Ok((chunks_count, size_bytes))
}

/// Excludes win; a non-empty include list must match.
fn should_include(path: &Path, options: &LearnOptions) -> bool {
    let path_str = path.to_string_lossy();

    if options.exclude.iter().any(|p| path_str.contains(p.as_str())) {
        return false;
    }

    options.include.is_empty() || options.include.iter().any(|p| path_str.contains(p.as_str()))
}

/// Delete all sources and chunks of a base.
pub fn clean(workspace: &Path, base_name: &str) -> AppResult<()> {
    tracing::info!("Cleaning document base '{}'", base_name);

    let index_path = config::get_index_path(workspace, base_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Document base '{}' does not exist",
            base_name
        )));
    }

    let conn = index::init_index(&index_path)?;
    index::reset_index(&conn)?;

    Ok(())
}

/// Get statistics for a base.
pub fn stats(workspace: &Path, base_name: &str) -> AppResult<BaseStats> {
    let index_path = config::get_index_path(workspace, base_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Document base '{}' does not exist",
            base_name
        )));
    }

    let conn = index::init_index(&index_path)?;
    let (sources_count, chunks_count) = index::get_stats(&conn)?;
    let last_learn_at = index::get_last_learn_at(&conn)?;

    let db_size_bytes = std::fs::metadata(&index_path)
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(BaseStats {
        base_name: base_name.to_string(),
        sources_count,
        chunks_count,
        db_size_bytes,
        last_learn_at,
    })
}
