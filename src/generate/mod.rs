//! Generation pipeline: request validation, candidate routing, backend
//! invocation and failure classification.

mod backend;
mod candidates;
mod classifier;
mod engine;

pub use backend::{GenerationBackend, HttpBackend, ModelInfo};
pub use candidates::CandidateList;
pub use classifier::{ErrorVerdict, classify};
pub use engine::GenerationEngine;

use serde::{Deserialize, Serialize};

use crate::{AnimflowError, Result};

/// Validated inputs of one generation call.
///
/// Both fields are required and non-empty after trimming; the constructor
/// is the validation boundary, so a request that exists is always valid.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    source_content: String,
    instruction_text: String,
}

impl GenerationRequest {
    pub fn new(
        source_content: impl Into<String>,
        instruction_text: impl Into<String>,
    ) -> Result<Self> {
        let source_content = source_content.into();
        let instruction_text = instruction_text.into();

        if source_content.trim().is_empty() {
            return Err(AnimflowError::Validation("source content is required".to_string()));
        }
        if instruction_text.trim().is_empty() {
            return Err(AnimflowError::Validation("instruction text is required".to_string()));
        }

        Ok(Self {
            source_content,
            instruction_text,
        })
    }

    pub fn source_content(&self) -> &str {
        &self.source_content
    }

    pub fn instruction_text(&self) -> &str {
        &self.instruction_text
    }
}

/// Result of a successful generation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    /// Generated content, whitespace-trimmed.
    pub output_content: String,
    /// The candidate that produced the content.
    pub model_used: String,
}
