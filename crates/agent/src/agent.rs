//! The orchestration loop.
//!
//! Each question runs a bounded series of delegate rounds. A round either
//! ends the question with a final answer or requests one capability, whose
//! text result is appended to the conversation before the next round.

use crate::capability::{self, Capability, QUERY_SQL_DATABASE};
use crate::conversation::Conversation;
use crate::dispatch::CapabilityDispatcher;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tif_core::{AppError, AppResult};
use tif_llm::{ChatRequest, LlmClient, ToolDefinition};

pub const DEFAULT_MAX_STEPS: usize = 10;

pub const EMPTY_RESPONSE_APOLOGY: &str =
    "I apologize, but I couldn't generate a response. Please try rephrasing your question.";

/// Returned instead of [`EMPTY_RESPONSE_APOLOGY`] when sources were consulted
/// but the delegate's final content is empty.
pub const EMPTY_ANSWER_AFTER_SOURCES_APOLOGY: &str =
    "I apologize, but I couldn't generate a meaningful response. Please try rephrasing your question.";

pub struct TifAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    dispatcher: CapabilityDispatcher,
    tools: Vec<ToolDefinition>,
    conversation: Conversation,
    max_steps: usize,
    sources: BTreeSet<&'static str>,
}

impl TifAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        dispatcher: CapabilityDispatcher,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            dispatcher,
            tools: capability::catalog(),
            conversation: Conversation::new(system_prompt),
            max_steps: DEFAULT_MAX_STEPS,
            sources: BTreeSet::new(),
        }
    }

    /// Maximum delegate rounds per question (at least 1).
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Sources consulted while answering the most recent question, sorted.
    pub fn sources_used(&self) -> Vec<&'static str> {
        self.sources.iter().copied().collect()
    }

    pub fn dispatcher(&self) -> &CapabilityDispatcher {
        &self.dispatcher
    }

    /// Answer one question. Never fails; errors become the answer text.
    pub async fn process_query(&mut self, question: &str) -> String {
        let started = Instant::now();

        let answer = match self.run(question).await {
            Ok(answer) => answer,
            Err(AppError::EmptyResponse) => {
                tracing::warn!("Delegate returned an empty final response");
                EMPTY_RESPONSE_APOLOGY.to_string()
            }
            Err(e) => {
                tracing::error!("Question failed: {}", e);
                format!(
                    "I encountered an error while processing your question: {}. Please try again.",
                    e
                )
            }
        };

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Answered question"
        );
        answer
    }

    async fn run(&mut self, question: &str) -> AppResult<String> {
        self.sources.clear();
        let mut executed_queries: HashSet<String> = HashSet::new();

        self.conversation.push_user(question);

        for step in 1..=self.max_steps {
            tracing::debug!(
                step,
                turns = self.conversation.len(),
                "Sending conversation to delegate"
            );

            let request = ChatRequest::new(&self.model, self.conversation.messages().to_vec())
                .with_tools(self.tools.clone());

            let response = self
                .llm
                .chat(&request)
                .await
                .map_err(|e| AppError::Delegate(e.to_string()))?;

            let Some(call) = response.tool_calls.first().cloned() else {
                return self.finish(response.content);
            };

            if response.tool_calls.len() > 1 {
                tracing::warn!(
                    "Delegate requested {} tools at once; running only {}",
                    response.tool_calls.len(),
                    call.name
                );
            }

            tracing::info!(tool = %call.name, arguments = %call.arguments, "Capability requested");

            let capability = Capability::parse(&call)?;

            if call.name == QUERY_SQL_DATABASE
                && !executed_queries.insert(capability::signature(&call)?)
            {
                tracing::info!("Skipping duplicate structured query");
                self.conversation.push_assistant(response.content);
                continue;
            }

            self.conversation
                .push_tool_request(response.content, call.clone());

            let started = Instant::now();
            let result = match &capability {
                Some(capability) => self.dispatcher.dispatch(capability).await,
                None => {
                    tracing::warn!("Delegate requested unknown capability {}", call.name);
                    format!("Unknown function: {}", call.name)
                }
            };
            tracing::debug!(
                tool = %call.name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Capability finished"
            );

            if let Some(label) = capability.as_ref().and_then(Capability::source_label) {
                self.sources.insert(label);
            }

            self.conversation.push_tool_result(&call, result);
        }

        Err(AppError::StepLimitExceeded {
            max_steps: self.max_steps,
        })
    }

    fn finish(&mut self, content: String) -> AppResult<String> {
        if content.trim().is_empty() {
            if self.sources.is_empty() {
                return Err(AppError::EmptyResponse);
            }
            tracing::warn!("Delegate returned an empty final response after consulting sources");
            return Ok(EMPTY_ANSWER_AFTER_SOURCES_APOLOGY.to_string());
        }

        self.conversation.push_assistant(content.clone());

        if self.sources.is_empty() {
            return Ok(content);
        }

        let labels: Vec<&str> = self.sources.iter().copied().collect();
        Ok(format!("{}\n\n[Source: {}]", content, labels.join(" and ")))
    }
}
