//! Document index type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a document base, persisted as
/// `.tif/knowledge/<base>/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Name of the base
    pub name: String,

    /// Embedding provider: "openai", "ollama" or "mock"
    pub provider: String,

    /// Embedding model
    pub model: String,

    /// Embedding API base URL (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Upper bound on the characters of context passed to synthesis
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: u32,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: u32,
}

fn default_chunk_size() -> u32 {
    512
}

fn default_chunk_overlap() -> u32 {
    64
}

fn default_embedding_dim() -> u32 {
    1536
}

fn default_max_context_chars() -> u32 {
    12_000
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            endpoint: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_context_chars: default_max_context_chars(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

/// A document ingested into the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub id: String,

    /// File the text was extracted from
    pub path: PathBuf,

    /// "pdf", "markdown", "html" or "text"
    pub content_type: String,

    pub learned_at: DateTime<Utc>,

    pub size_bytes: u64,
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,

    pub source_id: String,

    /// Position within source
    pub position: u32,

    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Byte offsets and source path
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl KnowledgeChunk {
    /// File name of the document this chunk came from, if recorded.
    pub fn source_name(&self) -> Option<&str> {
        self.metadata
            .get("source_path")
            .and_then(|p| p.as_str())
            .and_then(|p| p.rsplit(['/', '\\']).next())
    }
}

/// Options for the learn operation.
#[derive(Debug, Clone)]
pub struct LearnOptions {
    /// Base name
    pub base_name: String,

    /// Files or directories to index
    pub paths: Vec<PathBuf>,

    /// Substrings a path must contain (any); empty means all
    pub include: Vec<String>,

    /// Substrings that exclude a path
    pub exclude: Vec<String>,

    /// Reset the base before learning
    pub reset: bool,
}

/// Statistics from a learn operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnStats {
    pub sources_count: u32,

    pub chunks_count: u32,

    /// Files that could not be parsed or embedded
    pub skipped_count: u32,

    pub bytes_processed: u64,

    pub duration_secs: f64,
}

/// Statistics for a base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    pub base_name: String,

    pub sources_count: u32,

    pub chunks_count: u32,

    pub db_size_bytes: u64,

    pub last_learn_at: Option<DateTime<Utc>>,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source_id: String,
    pub position: u32,
    pub text: String,
    pub metadata: serde_json::Value,
}
