//! Retrieval-augmented answering over the document index.
//!
//! A question is embedded, the closest chunks are pulled from the SQLite
//! index, and the delegate synthesizes an answer from them with the
//! `rag.answer` prompt.

pub mod types;

pub use types::{RagResponse, RagSourceRef, CONFIDENCE_THRESHOLD, MIN_RELEVANCE_SCORE};

use crate::embeddings::EmbeddingProvider;
use crate::types::KnowledgeChunk;
use crate::{config, index};
use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tif_core::{AppError, AppResult};
use tif_llm::{LlmClient, LlmRequest};
use tif_prompt::{build_prompt, load_prompt, PromptDefinition, RAG_ANSWER};

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 10;

const MAX_SNIPPET_LENGTH: usize = 150;

/// Answers natural-language questions from indexed documents.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn query(&self, question: &str) -> AppResult<String>;
}

/// SQLite-backed [`DocumentIndex`].
pub struct RagIndex {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    top_k: usize,
    max_context_chars: usize,
}

impl RagIndex {
    pub fn new(
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
    ) -> Self {
        Self {
            conn: Mutex::new(conn),
            embedder,
            llm,
            model: model.into(),
            prompt,
            top_k: DEFAULT_TOP_K,
            max_context_chars: 12_000,
        }
    }

    /// Open the index of an existing base in `workspace`.
    ///
    /// Fails when the base has never been indexed.
    pub fn open(
        workspace: &Path,
        base_name: &str,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        let base_config = config::load_config(workspace, base_name)?;
        let index_path = Self::existing_index_path(workspace, base_name)?;

        let conn = index::init_index(&index_path)?;
        let prompt = load_prompt(workspace, RAG_ANSWER)?;

        Ok(Self::new(conn, embedder, llm, model, prompt)
            .with_max_context_chars(base_config.max_context_chars as usize))
    }

    /// Path of the base's index file, or an error when it was never built.
    pub fn existing_index_path(workspace: &Path, base_name: &str) -> AppResult<PathBuf> {
        let index_path = config::get_index_path(workspace, base_name);

        if !index_path.exists() {
            return Err(AppError::Knowledge(format!(
                "Document base '{}' has no index. Run 'tif index' first.",
                base_name
            )));
        }

        Ok(index_path)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    /// Retrieve, filter and synthesize an answer with its sources.
    pub async fn answer(&self, question: &str) -> AppResult<RagResponse> {
        tracing::info!("Document search: {}", question);

        let query_embedding = self.embedder.embed(question).await?;

        let results = {
            let conn = self
                .conn
                .lock()
                .map_err(|_| AppError::Knowledge("Document index lock poisoned".to_string()))?;
            index::query_chunks(&conn, &query_embedding, self.top_k)?
        };

        let relevant: Vec<(KnowledgeChunk, f32)> = results
            .into_iter()
            .filter(|(_, score)| *score >= MIN_RELEVANCE_SCORE)
            .collect();

        let Some(max_score) = relevant.first().map(|(_, score)| *score) else {
            tracing::info!(
                "No relevant chunks found (all scores below {:.2})",
                MIN_RELEVANCE_SCORE
            );
            return Ok(RagResponse::no_information(question));
        };

        let chunks: Vec<&KnowledgeChunk> = relevant.iter().map(|(chunk, _)| chunk).collect();
        let low_confidence = max_score < CONFIDENCE_THRESHOLD;

        tracing::debug!(
            "Using {} chunks (max score: {:.3}, low_confidence: {})",
            chunks.len(),
            max_score,
            low_confidence
        );

        let context = build_context(&chunks, self.max_context_chars);
        let answer = self.synthesize(question, &context, low_confidence).await?;

        Ok(RagResponse::new(answer, map_chunks_to_sources(&chunks), max_score))
    }

    async fn synthesize(
        &self,
        question: &str,
        context: &str,
        low_confidence: bool,
    ) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("context".to_string(), context.to_string());
        if low_confidence {
            variables.insert("lowConfidence".to_string(), "true".to_string());
        }

        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model).with_temperature(0.3);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::Knowledge(format!("Answer synthesis failed: {}", e)))?;

        Ok(response.content.trim().to_string())
    }
}

#[async_trait]
impl DocumentIndex for RagIndex {
    async fn query(&self, question: &str) -> AppResult<String> {
        Ok(self.answer(question).await?.answer)
    }
}

/// Stand-in used when no index can be opened. Every query fails with the
/// reason, which the agent reports to the delegate as text.
pub struct UnavailableIndex {
    reason: String,
}

impl UnavailableIndex {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl DocumentIndex for UnavailableIndex {
    async fn query(&self, _question: &str) -> AppResult<String> {
        Err(AppError::Knowledge(self.reason.clone()))
    }
}

/// Join chunk texts, best first, stopping before `max_chars` is exceeded.
/// The best chunk is always included.
fn build_context(chunks: &[&KnowledgeChunk], max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut used = 0;

    for (i, chunk) in chunks.iter().enumerate() {
        let part = format!("[Document {}]\n{}", i + 1, chunk.text);
        if !parts.is_empty() && used + part.len() > max_chars {
            break;
        }
        used += part.len();
        parts.push(part);
    }

    parts.join("\n\n---\n\n")
}

fn map_chunks_to_sources(chunks: &[&KnowledgeChunk]) -> Vec<RagSourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for chunk in chunks {
        let source = chunk
            .source_name()
            .map(str::to_string)
            .unwrap_or_else(|| chunk.source_id.clone());
        let location = extract_location(chunk);

        if seen.insert((source.clone(), location.clone())) {
            sources.push(RagSourceRef {
                source,
                location,
                snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
            });
        }
    }

    sources
}

fn extract_location(chunk: &KnowledgeChunk) -> String {
    let start = chunk.metadata.get("start").and_then(|v| v.as_u64());
    let end = chunk.metadata.get("end").and_then(|v| v.as_u64());

    match (start, end) {
        (Some(start), Some(end)) => format!("chars {}-{}", start, end),
        _ => format!("position {}", chunk.position),
    }
}

fn truncate_snippet(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }

    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let truncated = &text[..cut];

    match truncated.rfind(char::is_whitespace) {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str, metadata: serde_json::Value) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source_id: "source-uuid".to_string(),
            position: 3,
            text: text.to_string(),
            embedding: None,
            metadata,
        }
    }

    #[test]
    fn test_build_context_numbers_chunks() {
        let a = chunk("1", "First chunk", serde_json::json!({}));
        let b = chunk("2", "Second chunk", serde_json::json!({}));

        let context = build_context(&[&a, &b], 10_000);
        assert!(context.contains("[Document 1]\nFirst chunk"));
        assert!(context.contains("[Document 2]\nSecond chunk"));
        assert!(context.contains("---"));
    }

    #[test]
    fn test_build_context_respects_limit() {
        let a = chunk("1", &"a".repeat(100), serde_json::json!({}));
        let b = chunk("2", &"b".repeat(100), serde_json::json!({}));

        let context = build_context(&[&a, &b], 150);
        assert!(context.contains("aaaa"));
        assert!(!context.contains("bbbb"));

        // The best chunk survives even a tiny limit.
        assert!(build_context(&[&a], 10).contains("aaaa"));
    }

    #[test]
    fn test_sources_deduplicated() {
        let meta = serde_json::json!({"source_path": "pdfs/jp.pdf", "start": 0, "end": 512});
        let a = chunk("1", "text", meta.clone());
        let b = chunk("2", "text", meta);

        let sources = map_chunks_to_sources(&[&a, &b]);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source, "jp.pdf");
        assert_eq!(sources[0].location, "chars 0-512");
    }

    #[tokio::test]
    async fn test_unavailable_index_reports_reason() {
        let index = UnavailableIndex::new("Document base 'tif' has no index. Run 'tif index' first.");

        let err = index.query("District goals").await.unwrap_err();
        assert!(matches!(err, AppError::Knowledge(_)));
        assert!(err.to_string().contains("Run 'tif index' first"));
    }

    #[test]
    fn test_location_falls_back_to_position() {
        let c = chunk("1", "text", serde_json::json!({}));
        assert_eq!(extract_location(&c), "position 3");
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("Short text", 100), "Short text");

        let result = truncate_snippet(
            "This is a very long text that needs to be truncated at some point",
            30,
        );
        assert!(result.len() <= 33);
        assert!(result.ends_with("..."));

        assert!(truncate_snippet(&"é".repeat(100), 15).ends_with("..."));
    }
}
