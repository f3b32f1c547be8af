//! Provider-agnostic chat and tool-calling types.
//!
//! The orchestration agent speaks to the delegate through these types; each
//! provider translates them to its own wire format.

use serde::{Deserialize, Serialize};

use crate::client::LlmUsage;

/// Role of a chat message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
    /// Tool result.
    Tool,
}

impl Role {
    /// Wire name shared by the OpenAI and Ollama chat APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A tool the delegate may ask the caller to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the caller's dispatch table)
    pub name: String,

    /// Human-readable description of what the tool does
    pub description: String,

    /// JSON Schema object describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the delegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier assigned by the provider
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// JSON-encoded argument object
    pub arguments: String,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,

    pub content: String,

    /// Tool calls requested by the assistant (only for `Role::Assistant`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Call this message answers (only for `Role::Tool`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool name this message answers (only for `Role::Tool`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Create an assistant message without tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Create an assistant message carrying the tool call it requested.
    pub fn assistant_with_tool_call(content: impl Into<String>, call: ToolCall) -> Self {
        Self {
            tool_calls: vec![call],
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Create a tool result message answering `call`.
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name.clone()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,

    /// Full ordered conversation
    pub messages: Vec<ChatMessage>,

    /// Tools the delegate may request
    pub tools: Vec<ToolDefinition>,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a request over a conversation, with no tools.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Offer tools to the delegate.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// A chat completion response.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Generated text (may be empty when a tool is requested)
    pub content: String,

    /// Tool calls requested by the delegate, in order
    pub tool_calls: Vec<ToolCall>,

    pub model: String,

    pub usage: LlmUsage,
}

impl ChatResponse {
    /// Whether the delegate asked for at least one tool.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
