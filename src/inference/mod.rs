//! Inference Client — streaming access to a local Ollama server.
//!
//! This module handles all communication with the model endpoint:
//! - `POST /api/generate` with NDJSON response streaming
//! - Width-bounded line buffering and throttled live terminal display
//! - Interaction history hand-off
//! - Client configuration loading from `ollama-research.yaml`

pub mod accumulator;
pub mod client;
pub mod config;
pub mod display;
pub mod errors;
pub mod history;
pub mod streaming;
pub mod types;

// Re-exports for convenience
pub use accumulator::LineAccumulator;
pub use client::{InferenceClient, PromptProcessor};
pub use config::{ClientConfig, DisplayMode};
pub use errors::InferenceError;
pub use history::{Interaction, InteractionLog, MemoryInteractionLog, TracingInteractionLog};
pub use types::{GenerateChunk, GenerateRequest};
