//! Error types for the TIF question-answering agent.
//!
//! One enum covers every error category in the workspace: configuration,
//! I/O, LLM transport, document index, tabular store, prompt rendering and
//! the agent loop's own terminal conditions.

use thiserror::Error;

/// Unified error type for the TIF agent.
///
/// Library functions return `Result<T, AppError>`. Backend failures that the
/// agent recovers from are converted to text at the capability boundary;
/// only the agent-loop variants (`Delegate`, `Capability`, `EmptyResponse`,
/// `StepLimitExceeded`) terminate a question.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document index and RAG errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Tabular store errors (CSV loading, SQL execution)
    #[error("Data error: {0}")]
    Data(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The completion service could not be reached or answered with an error
    #[error("Delegate call failed: {0}")]
    Delegate(String),

    /// A capability request from the delegate could not be parsed
    #[error("Invalid capability request: {0}")]
    Capability(String),

    /// The delegate produced neither content nor a capability request
    #[error("Delegate returned an empty response")]
    EmptyResponse,

    /// The delegate kept requesting capabilities past the configured limit
    #[error("Step limit exceeded: no final answer after {max_steps} delegate rounds")]
    StepLimitExceeded { max_steps: usize },

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_limit_message() {
        let err = AppError::StepLimitExceeded { max_steps: 10 };
        assert!(err.to_string().contains("10 delegate rounds"));
    }

    #[test]
    fn test_json_error_conversion() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
