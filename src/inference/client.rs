//! Streaming inference client for a local Ollama server.
//!
//! Sends one prompt to `/api/generate`, renders the streamed reply live, and
//! returns the assembled text. Transport and HTTP failures come back as
//! [`InferenceError`] values, never as text that could be mistaken for model
//! output.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use reqwest::Client as HttpClient;

use super::accumulator::LineAccumulator;
use super::config::{ClientConfig, DisplayMode};
use super::display::{open_display, terminal_width, RefreshThrottle, StreamDisplay};
use super::errors::InferenceError;
use super::history::{Interaction, InteractionLog, TracingInteractionLog};
use super::streaming::parse_ndjson_stream;
use super::types::GenerateRequest;

/// Prompt characters echoed into request logs.
const PROMPT_PREVIEW_CHARS: usize = 50;

// ─── PromptProcessor ─────────────────────────────────────────────────────────

/// Anything that can turn a prompt into a complete model reply.
///
/// Task functions depend on this rather than on [`InferenceClient`] so they
/// can run against scripted replies in tests.
pub trait PromptProcessor: Sync {
    /// Run `prompt` on `model`, attributing the exchange to `username`.
    fn process_prompt(
        &self,
        prompt: &str,
        model: &str,
        username: &str,
    ) -> impl Future<Output = Result<String, InferenceError>> + Send;
}

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the local inference server.
///
/// Holds no per-request state: the accumulated text, line buffer, display
/// and throttle all live inside one `generate` call, so a shared client can
/// serve concurrent requests.
pub struct InferenceClient {
    http: HttpClient,
    config: ClientConfig,
    history: Arc<dyn InteractionLog>,
    display_mode: DisplayMode,
}

impl InferenceClient {
    /// Create a client from configuration. Does NOT check connectivity.
    pub fn new(config: ClientConfig) -> Result<Self, InferenceError> {
        let http = HttpClient::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        tracing::info!(base_url = %config.base_url, "inference client initialized");

        Ok(Self {
            http,
            display_mode: config.display,
            config,
            history: Arc::new(TracingInteractionLog),
        })
    }

    /// Replace the history collaborator.
    pub fn with_history(mut self, history: Arc<dyn InteractionLog>) -> Self {
        self.history = history;
        self
    }

    /// Override the configured display mode.
    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = mode;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Model named in the configuration.
    pub fn default_model(&self) -> &str {
        &self.config.model
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    fn display_width(&self) -> usize {
        self.config.display_width.unwrap_or_else(terminal_width)
    }

    // ─── Generate (streaming) ────────────────────────────────────────────

    /// Send `prompt` to `model` and stream the reply.
    ///
    /// Returns the trimmed concatenation of every `response` fragment. The
    /// stream ends normally on `done: true` or when the body closes. On
    /// success the exchange is recorded with the history collaborator.
    pub async fn generate(
        &self,
        prompt: &str,
        model: &str,
        username: &str,
    ) -> Result<String, InferenceError> {
        let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        tracing::info!(username, model, prompt = %preview, "processing prompt");

        let result = self.try_generate(prompt, model).await;

        match result {
            Ok(full_response) => {
                let response = full_response.trim().to_string();
                tracing::info!(
                    username,
                    model,
                    response_chars = response.chars().count(),
                    "response generated"
                );
                self.history
                    .save_interaction(&Interaction::new(prompt, &response, username, model));
                Ok(response)
            }
            Err(e) => {
                tracing::error!(username, model, error = %e, "inference request failed");
                Err(e)
            }
        }
    }

    /// One request/response exchange, returning the untrimmed text.
    async fn try_generate(&self, prompt: &str, model: &str) -> Result<String, InferenceError> {
        let mut display = open_display(self.display_mode);
        self.stream_into(prompt, model, display.as_mut()).await
    }

    /// Run the exchange, rendering partial output into `display`.
    ///
    /// `display` sees at most `refresh_per_second` refreshes per second and
    /// exactly one `finish` once any text has arrived.
    async fn stream_into(
        &self,
        prompt: &str,
        model: &str,
        display: &mut dyn StreamDisplay,
    ) -> Result<String, InferenceError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let body = GenerateRequest { model, prompt };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let timeout_secs = self.config.request_timeout_secs;
        let bytes = response
            .bytes_stream()
            .map(move |read| read.map_err(|e| map_read_error(e, timeout_secs)));
        let chunks = parse_ndjson_stream(Box::pin(bytes));
        let mut chunks = std::pin::pin!(chunks);

        let mut full_response = String::new();
        let mut lines = LineAccumulator::new(self.display_width());
        let mut throttle = RefreshThrottle::per_second(self.config.refresh_per_second);

        let outcome = loop {
            let Some(item) = chunks.next().await else {
                break Ok(false);
            };
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => break Err(e),
            };
            if let Some(message) = chunk.error {
                break Err(InferenceError::StreamError {
                    reason: format!("server reported: {message}"),
                });
            }
            if let Some(text) = chunk.response.as_deref() {
                full_response.push_str(text);
                lines.append(text);
                if throttle.ready(Instant::now()) {
                    redraw(display, &lines, false);
                }
            }
            if chunk.done {
                break Ok(true);
            }
        };

        if !lines.is_empty() {
            redraw(display, &lines, true);
        }

        if !outcome? {
            tracing::debug!("stream closed without a done flag");
        }

        Ok(full_response)
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                duration_secs: self.config.request_timeout_secs,
            }
        } else {
            InferenceError::ConnectionFailed {
                endpoint: url.to_string(),
                reason: error_chain(&e),
            }
        }
    }

    // ─── Health Check ────────────────────────────────────────────────────

    /// Whether the server answers `GET /api/tags` with 2xx.
    ///
    /// Uses the connect timeout as the whole budget; never errors.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);

        match self
            .http
            .get(&url)
            .timeout(self.config.connect_timeout())
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "health check failed");
                false
            }
        }
    }
}

impl PromptProcessor for InferenceClient {
    async fn process_prompt(
        &self,
        prompt: &str,
        model: &str,
        username: &str,
    ) -> Result<String, InferenceError> {
        self.generate(prompt, model, username).await
    }
}

/// Push the current buffer to the display. Display failures never fail the
/// request.
fn redraw(display: &mut dyn StreamDisplay, lines: &LineAccumulator, last: bool) {
    let rendered = lines.render();
    let result = if last {
        display.finish(&rendered)
    } else {
        display.refresh(&rendered)
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "live display update failed");
    }
}

/// The client-wide timeout also covers reading the body, so a slow stream
/// surfaces as `Timeout` rather than a generic read failure.
fn map_read_error(e: reqwest::Error, timeout_secs: u64) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Timeout {
            duration_secs: timeout_secs,
        }
    } else {
        InferenceError::StreamError {
            reason: format!("stream read error: {}", error_chain(&e)),
        }
    }
}

/// `reqwest` keeps the useful part (refused, DNS) in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}

// ─── Tests ───────────────────────────────────────────────────────────────────
