//! Wire types for Ollama's `/api/generate` endpoint.

use serde::{Deserialize, Serialize};

// ─── Request Types ───────────────────────────────────────────────────────────

/// Request body for `POST /api/generate`.
///
/// Ollama streams by default, so no `stream` flag is sent.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// One newline-delimited JSON object from the streamed response body.
///
/// Ollama sends many more fields (`created_at`, `context`, timing counters);
/// only the ones the client acts on are decoded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateChunk {
    /// Incremental text fragment.
    #[serde(default)]
    pub response: Option<String>,
    /// Set on the final object of the stream.
    #[serde(default)]
    pub done: bool,
    /// Present when the server aborts generation mid-stream.
    #[serde(default)]
    pub error: Option<String>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
