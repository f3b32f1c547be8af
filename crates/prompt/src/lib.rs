//! Prompt system for the TIF agent.
//!
//! Prompts are YAML definitions with Handlebars templates. Built-in
//! definitions ship with the binary; a workspace can override any of them
//! with `.tif/prompts/<id>.yml`.

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, list_prompts, load_prompt, AGENT_SYSTEM, RAG_ANSWER, SQL_NARRATE};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOrigin,
    PromptOutputSpec,
};
