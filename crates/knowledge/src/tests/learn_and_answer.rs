//! End-to-end indexing and answering with the offline embedder.

use crate::embeddings::providers::mock::MockProvider;
use crate::{clean, config, learn, stats, DocumentIndex, KnowledgeBaseConfig, LearnOptions, RagIndex};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tif_core::{AppError, AppResult};
use tif_llm::{ChatRequest, ChatResponse, LlmClient, LlmRequest, LlmResponse, LlmUsage};

/// Records every completion request and answers with a fixed text.
#[derive(Default)]
struct RecordingLlm {
    requests: Mutex<Vec<LlmRequest>>,
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(LlmResponse {
            content: "  The goals are affordable housing and job training.  ".to_string(),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 10),
        })
    }

    async fn chat(&self, _request: &ChatRequest) -> AppResult<ChatResponse> {
        Err(AppError::Llm("chat not scripted".to_string()))
    }
}

fn setup_base(workspace: &Path) {
    config::save_config(
        workspace,
        &KnowledgeBaseConfig {
            name: "tif".to_string(),
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            embedding_dim: 256,
            ..Default::default()
        },
    )
    .unwrap();

    let docs = workspace.join("pdfs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("jefferson_park.txt"),
        "Jefferson Park district goals include affordable housing and job training.",
    )
    .unwrap();
    fs::write(
        docs.join("notes.md"),
        "# Infrastructure\n\nStreet resurfacing and viaduct repairs are planned.",
    )
    .unwrap();
    fs::write(docs.join("blob.bin"), b"\0\0\0binary").unwrap();
}

fn options(workspace: &Path, reset: bool) -> LearnOptions {
    LearnOptions {
        base_name: "tif".to_string(),
        paths: vec![workspace.join("pdfs")],
        include: Vec::new(),
        exclude: Vec::new(),
        reset,
    }
}

fn open_index(workspace: &Path, llm: Arc<RecordingLlm>) -> RagIndex {
    RagIndex::open(
        workspace,
        "tif",
        Arc::new(MockProvider::new(256)),
        llm,
        "gpt-4o",
    )
    .unwrap()
}

#[tokio::test]
async fn test_learn_counts_sources_and_skips_binary() {
    let temp = TempDir::new().unwrap();
    setup_base(temp.path());

    let learned = learn(temp.path(), options(temp.path(), false), None)
        .await
        .unwrap();

    assert_eq!(learned.sources_count, 2);
    assert_eq!(learned.skipped_count, 1);
    assert!(learned.chunks_count >= 2);

    let base = stats(temp.path(), "tif").unwrap();
    assert_eq!(base.sources_count, 2);
    assert!(base.last_learn_at.is_some());
}

#[tokio::test]
async fn test_relearn_replaces_instead_of_duplicating() {
    let temp = TempDir::new().unwrap();
    setup_base(temp.path());

    learn(temp.path(), options(temp.path(), false), None)
        .await
        .unwrap();
    learn(temp.path(), options(temp.path(), false), None)
        .await
        .unwrap();

    assert_eq!(stats(temp.path(), "tif").unwrap().sources_count, 2);
}

#[tokio::test]
async fn test_answer_uses_relevant_excerpts() {
    let temp = TempDir::new().unwrap();
    setup_base(temp.path());
    learn(temp.path(), options(temp.path(), false), None)
        .await
        .unwrap();

    let llm = Arc::new(RecordingLlm::default());
    let index = open_index(temp.path(), Arc::clone(&llm));

    let response = index.answer("affordable housing goals").await.unwrap();

    assert_eq!(
        response.answer,
        "The goals are affordable housing and job training."
    );
    assert!(!response.low_confidence);
    assert_eq!(response.sources[0].source, "jefferson_park.txt");

    let requests = llm.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gpt-4o");
    assert!(requests[0].prompt.contains("affordable housing goals"));
    assert!(requests[0].prompt.contains("job training"));
    assert!(!requests[0]
        .system
        .as_deref()
        .unwrap_or_default()
        .contains("may not answer"));
}

#[tokio::test]
async fn test_unrelated_question_skips_synthesis() {
    let temp = TempDir::new().unwrap();
    setup_base(temp.path());
    learn(temp.path(), options(temp.path(), false), None)
        .await
        .unwrap();

    let llm = Arc::new(RecordingLlm::default());
    let index = open_index(temp.path(), Arc::clone(&llm));

    let answer = index.query("zzzqqq xxyyzz").await.unwrap();

    assert!(answer.contains("could not find information"));
    assert!(llm.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_clean_empties_base() {
    let temp = TempDir::new().unwrap();
    setup_base(temp.path());
    learn(temp.path(), options(temp.path(), false), None)
        .await
        .unwrap();

    clean(temp.path(), "tif").unwrap();

    let base = stats(temp.path(), "tif").unwrap();
    assert_eq!(base.sources_count, 0);
    assert_eq!(base.chunks_count, 0);
}

#[test]
fn test_open_without_index_fails() {
    let temp = TempDir::new().unwrap();
    let result = RagIndex::open(
        temp.path(),
        "tif",
        Arc::new(MockProvider::new(8)),
        Arc::new(RecordingLlm::default()),
        "gpt-4o",
    );

    assert!(result.is_err());
    assert!(stats(temp.path(), "missing").is_err());
}
