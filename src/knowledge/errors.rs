//! Research task error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// Errors returned by the research task functions.
///
/// `Transport`, `Decode` and `Validation` together form the model-inference
/// failure class; see [`KnowledgeError::is_model_inference`].
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// The caller supplied unusable input. Never retried.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The inference request itself failed.
    #[error("{task}: inference request failed: {source}")]
    Transport {
        task: &'static str,
        #[source]
        source: InferenceError,
    },

    /// The model reply could not be decoded.
    #[error("{task}: error parsing model response: {reason}")]
    Decode { task: &'static str, reason: String },

    /// The model reply decoded but violates the expected shape or range.
    #[error("{task}: invalid model response: {reason}")]
    Validation { task: &'static str, reason: String },

    /// Failure while issuing a knowledge-base update.
    #[error("error updating knowledge base: {reason}")]
    DataProcessing {
        reason: String,
        #[source]
        source: Option<InferenceError>,
    },
}

impl KnowledgeError {
    /// Whether this is a model-inference failure (transport, decode or
    /// validation) as opposed to bad input or a data-processing failure.
    pub fn is_model_inference(&self) -> bool {
        matches!(
            self,
            KnowledgeError::Transport { .. }
                | KnowledgeError::Decode { .. }
                | KnowledgeError::Validation { .. }
        )
    }

    /// Task label attached to model-inference failures.
    pub fn task(&self) -> Option<&'static str> {
        match self {
            KnowledgeError::Transport { task, .. }
            | KnowledgeError::Decode { task, .. }
            | KnowledgeError::Validation { task, .. } => Some(*task),
            _ => None,
        }
    }
}
