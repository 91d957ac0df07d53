//! NDJSON streaming response parser for Ollama's generate endpoint.
//!
//! Reads the HTTP body as a byte stream, splits it on `\n`, and decodes each
//! non-empty line as a [`GenerateChunk`]. Lines may be split across network
//! reads; bytes are buffered until a newline arrives so multi-byte UTF-8
//! sequences are never cut in half.
//!
//! A line that is not valid JSON is skipped with a warning; the stream keeps
//! going. End of body is a normal termination, as is `done: true` (which the
//! caller acts on). Read errors arrive already mapped to [`InferenceError`]
//! so the caller decides what a timeout mid-body means.

use futures::stream::{self, Stream, StreamExt};

use super::errors::InferenceError;
use super::types::GenerateChunk;

/// Longest slice of a malformed line echoed into the log.
const MAX_LOGGED_LINE: usize = 200;

// ─── NDJSON stream parser ────────────────────────────────────────────────────

/// Parse a raw byte stream into [`GenerateChunk`]s.
///
/// Generic over the byte container so the same code drives
/// `reqwest::Response::bytes_stream()` and in-memory test streams. The first
/// read error is yielded as-is and ends the stream.
pub fn parse_ndjson_stream<S, B>(
    byte_stream: S,
) -> impl Stream<Item = Result<GenerateChunk, InferenceError>>
where
    S: Stream<Item = Result<B, InferenceError>> + Unpin,
    B: AsRef<[u8]>,
{
    stream::unfold(
        (byte_stream, LineDecoder::default(), false),
        |(mut byte_stream, mut decoder, mut exhausted)| async move {
            loop {
                if let Some(line) = decoder.next_line() {
                    match decode_line(&line) {
                        Some(chunk) => {
                            return Some((Ok(chunk), (byte_stream, decoder, exhausted)));
                        }
                        None => continue,
                    }
                }

                if exhausted {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => decoder.push(bytes.as_ref()),
                    Some(Err(e)) => {
                        // Whatever is buffered is incomplete; drop it.
                        decoder.clear();
                        return Some((Err(e), (byte_stream, decoder, true)));
                    }
                    None => {
                        exhausted = true;
                        decoder.finish();
                    }
                }
            }
        },
    )
}

/// Decode one trimmed, non-empty line. Malformed lines yield `None`.
fn decode_line(line: &str) -> Option<GenerateChunk> {
    match serde_json::from_str::<GenerateChunk>(line) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            let shown: String = line.chars().take(MAX_LOGGED_LINE).collect();
            tracing::warn!(error = %e, line = %shown, "skipping malformed stream line");
            None
        }
    }
}

// ─── Line Decoder ────────────────────────────────────────────────────────────

/// Byte buffer that yields complete `\n`-terminated lines.
#[derive(Debug, Default)]
struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pop the next complete non-blank line, trimmed.
    fn next_line(&mut self) -> Option<String> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        None
    }

    /// Terminate a trailing line that arrived without its newline.
    fn finish(&mut self) {
        if !self.buffer.is_empty() && self.buffer.last() != Some(&b'\n') {
            self.buffer.push(b'\n');
        }
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
