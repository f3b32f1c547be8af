//! Scripted-delegate tests for the agent loop and capability dispatch.


use crate::{CapabilityDispatcher, QueryTranslator, ResultNarrator, TifAgent};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tif_core::{AppError, AppResult};
use tif_data::{QueryOutput, SqliteStore, TabularStore};
use tif_knowledge::DocumentIndex;
use tif_llm::{
    ChatRequest, ChatResponse, LlmClient, LlmRequest, LlmResponse, LlmUsage, ToolCall,
};
use tif_prompt::{builtin_prompt, SQL_NARRATE};

pub(crate) const SYSTEM_PROMPT: &str = "You help users understand TIF data.";

/// Replays scripted responses in order and records every request.
/// Fails once a script runs out.
#[derive(Default)]
pub(crate) struct ScriptedDelegate {
    chats: Mutex<VecDeque<ChatResponse>>,
    completions: Mutex<VecDeque<AppResult<String>>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub completion_requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedDelegate {
    pub fn with_chats(chats: Vec<ChatResponse>) -> Arc<Self> {
        Arc::new(Self {
            chats: Mutex::new(chats.into()),
            ..Default::default()
        })
    }

    pub fn with_completions(completions: Vec<AppResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            completions: Mutex::new(completions.into()),
            ..Default::default()
        })
    }

    pub fn push_completions(&self, completions: Vec<AppResult<String>>) {
        self.completions.lock().unwrap().extend(completions);
    }

    pub fn chat_count(&self) -> usize {
        self.chat_requests.lock().unwrap().len()
    }

    pub fn completion_count(&self) -> usize {
        self.completion_requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedDelegate {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.completion_requests.lock().unwrap().push(request.clone());
        let next = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Llm("completion script exhausted".to_string())))?;

        Ok(LlmResponse {
            content: next,
            model: request.model.clone(),
            usage: LlmUsage::new(1, 1),
        })
    }

    async fn chat(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        self.chat_requests.lock().unwrap().push(request.clone());
        self.chats
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Llm("connection refused".to_string()))
    }
}

pub(crate) fn answer(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        ..Default::default()
    }
}

pub(crate) fn tool(id: &str, name: &str, arguments: &str) -> ChatResponse {
    ChatResponse {
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }],
        ..Default::default()
    }
}

pub(crate) fn sql_call(id: &str, question: &str) -> ChatResponse {
    tool(
        id,
        "query_sql_database",
        &serde_json::json!({ "query": question }).to_string(),
    )
}

/// Forwards to an in-memory SQLite store and counts executions.
pub(crate) struct CountingStore {
    inner: SqliteStore,
    executions: AtomicUsize,
}

impl CountingStore {
    pub fn expenditures() -> Arc<Self> {
        let inner = SqliteStore::in_memory().unwrap();
        inner
            .execute_batch(
                r#"
                CREATE TABLE expenditures (
                    "TIF District" TEXT, "Report Year" INTEGER,
                    "Administration" INTEGER, "Public Works" INTEGER
                );
                INSERT INTO expenditures VALUES ('District A', 2023, 1000000, 234567);
                INSERT INTO expenditures VALUES ('District A', 2022, 10, 20);
                INSERT INTO expenditures VALUES ('District B', 2023, 5, 5);
                "#,
            )
            .unwrap();

        Arc::new(Self {
            inner,
            executions: AtomicUsize::new(0),
        })
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl TabularStore for CountingStore {
    fn execute(&self, sql: &str) -> AppResult<QueryOutput> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(sql)
    }
}

/// Document index returning a fixed answer or failure.
pub(crate) struct StubIndex {
    answer: Result<String, String>,
    pub questions: Mutex<Vec<String>>,
}

impl StubIndex {
    pub fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(text.to_string()),
            questions: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
            questions: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl DocumentIndex for StubIndex {
    async fn query(&self, question: &str) -> AppResult<String> {
        self.questions.lock().unwrap().push(question.to_string());
        self.answer.clone().map_err(AppError::Knowledge)
    }
}

/// Everything a test needs to drive and inspect an agent.
pub(crate) struct Harness {
    pub agent: TifAgent,
    pub delegate: Arc<ScriptedDelegate>,
    pub translator: Arc<ScriptedDelegate>,
    pub narrator: Arc<ScriptedDelegate>,
    pub store: Arc<CountingStore>,
    pub index: Arc<StubIndex>,
    /// Store executions spent on schema discovery
    pub baseline: usize,
}

impl Harness {
    pub fn new(chats: Vec<ChatResponse>) -> Self {
        Self::with_index(chats, StubIndex::answering("No goals are listed."))
    }

    pub fn with_index(chats: Vec<ChatResponse>, index: Arc<StubIndex>) -> Self {
        let delegate = ScriptedDelegate::with_chats(chats);
        let translator = ScriptedDelegate::with_completions(Vec::new());
        let narrator = ScriptedDelegate::with_completions(Vec::new());
        let store = CountingStore::expenditures();

        let dispatcher = CapabilityDispatcher::new(
            store.clone(),
            "expenditures",
            index.clone(),
            QueryTranslator::new(translator.clone(), "gpt-4o-mini"),
            ResultNarrator::new(
                narrator.clone(),
                "gpt-4o",
                builtin_prompt(SQL_NARRATE).unwrap(),
            ),
        )
        .unwrap();
        let baseline = store.executions();

        let agent = TifAgent::new(delegate.clone(), "gpt-4o-mini", SYSTEM_PROMPT, dispatcher);

        Self {
            agent,
            delegate,
            translator,
            narrator,
            store,
            index,
            baseline,
        }
    }

    /// Store executions made while answering questions.
    pub fn query_executions(&self) -> usize {
        self.store.executions() - self.baseline
    }
}
