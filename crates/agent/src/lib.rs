//! Question-routing agent for TIF expenditure data.
//!
//! [`TifAgent`] asks the delegate which capability answers a question, runs
//! it through the [`CapabilityDispatcher`] (SQL over the tabular store or a
//! search of the document index), and returns the final answer with source
//! attribution.

pub mod agent;
pub mod capability;
pub mod conversation;
pub mod dispatch;
pub mod narrator;
pub mod translator;

#[cfg(test)]
mod tests;

pub use agent::{
    TifAgent, DEFAULT_MAX_STEPS, EMPTY_ANSWER_AFTER_SOURCES_APOLOGY, EMPTY_RESPONSE_APOLOGY,
};
pub use capability::{
    Capability, DocumentSearchArgs, HumanizeArgs, ResultSource, StructuredQueryArgs,
};
pub use conversation::Conversation;
pub use dispatch::CapabilityDispatcher;
pub use narrator::ResultNarrator;
pub use translator::{is_translation_failure, QueryTranslator};
