//! Interaction history collaborator.
//!
//! The client hands every successful exchange to an [`InteractionLog`]. The
//! crate ships a tracing-backed log (the default) and an in-memory one;
//! durable storage is left to embedders.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One completed prompt/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub prompt: String,
    pub response: String,
    pub username: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn new(prompt: &str, response: &str, username: &str, model: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            response: response.to_string(),
            username: username.to_string(),
            model: model.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only sink for completed interactions.
pub trait InteractionLog: Send + Sync {
    fn save_interaction(&self, interaction: &Interaction);
}

/// Emits each interaction as an info event on the `history` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInteractionLog;

impl InteractionLog for TracingInteractionLog {
    fn save_interaction(&self, interaction: &Interaction) {
        tracing::info!(
            target: "history",
            username = %interaction.username,
            model = %interaction.model,
            prompt_chars = interaction.prompt.chars().count(),
            response_chars = interaction.response.chars().count(),
            timestamp = %interaction.timestamp.to_rfc3339(),
            "interaction saved"
        );
    }
}

/// Keeps interactions in memory, oldest first.
#[derive(Debug, Default)]
pub struct MemoryInteractionLog {
    entries: Mutex<Vec<Interaction>>,
}

impl MemoryInteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<Interaction> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InteractionLog for MemoryInteractionLog {
    fn save_interaction(&self, interaction: &Interaction) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(interaction.clone());
    }
}
