//! Document answer types.

use serde::{Deserialize, Serialize};

/// Minimum score for high-confidence answering.
/// Below this the synthesis prompt asks for cautious language.
pub const CONFIDENCE_THRESHOLD: f32 = 0.30;

/// Chunks scoring below this are not passed to synthesis.
pub const MIN_RELEVANCE_SCORE: f32 = 0.20;

/// Where a piece of an answer came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSourceRef {
    /// Document file name (e.g. "jefferson_park_2019.pdf")
    pub source: String,

    /// Human-readable location, e.g. "chars 512-1024"
    pub location: String,

    /// Short excerpt of the supporting text
    pub snippet: String,
}

/// A synthesized answer over the document index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,

    pub sources: Vec<RagSourceRef>,

    /// Highest similarity score among the retrieved chunks
    #[serde(skip_serializing)]
    pub max_score: f32,

    #[serde(skip_serializing)]
    pub low_confidence: bool,
}

impl RagResponse {
    pub fn new(answer: String, sources: Vec<RagSourceRef>, max_score: f32) -> Self {
        Self {
            answer,
            sources,
            max_score,
            low_confidence: max_score < CONFIDENCE_THRESHOLD,
        }
    }

    /// Answer used when no chunk clears the relevance cutoff.
    pub fn no_information(question: &str) -> Self {
        Self {
            answer: format!(
                "I could not find information about \"{}\" in the available documents.",
                question
            ),
            sources: Vec::new(),
            max_score: 0.0,
            low_confidence: true,
        }
    }
}
