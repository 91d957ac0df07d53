pub mod inference;
pub mod knowledge;

#[cfg(test)]
pub(crate) mod test_support;

use std::io::Write;

pub use inference::{ClientConfig, InferenceClient, InferenceError, PromptProcessor};
pub use knowledge::KnowledgeError;

/// Log file name inside the data directory.
const LOG_FILE_NAME: &str = "ollama-research.log";

/// Return the platform-standard data directory for ollama-research.
///
/// - macOS: `~/Library/Application Support/ollama-research/`
/// - Windows: `{FOLDERID_RoamingAppData}\ollama-research\`
/// - Linux: `$XDG_DATA_HOME/ollama-research/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.ollama-research/` only if none of the above can be resolved.
pub fn data_dir() -> std::path::PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("ollama-research");
    }
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".ollama-research")
}

/// Initialize the tracing subscriber, writing structured logs to `log_dir`.
///
/// Logs go to a file rather than the terminal so they never tear the live
/// response display. On each startup:
/// 1. Rotates existing logs (`.log` → `.log.1` → `.2` → `.3`, keeps last 3).
/// 2. Opens a fresh log with a line-flushing writer for crash resilience.
/// 3. Logs a startup banner with the log path for discoverability.
///
/// Returns the path of the log file.
pub fn init_tracing(log_dir: &std::path::Path) -> std::io::Result<std::path::PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(LOG_FILE_NAME);

    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ollama_research=info,history=info,warn"));

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(FlushingWriter::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .try_init()
        .map_err(|e| std::io::Error::other(format!("tracing already initialized: {e}")))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== ollama-research starting ==="
    );

    Ok(log_path)
}

/// Rotate log files: `x.log` → `x.log.1` → `.2` → … → `.{keep}`.
///
/// Missing files in the chain are skipped; rotation never fails startup.
fn rotate_log_file(base_path: &std::path::Path, keep: u32) {
    let numbered = |n: u32| {
        let mut name = base_path.as_os_str().to_os_string();
        name.push(format!(".{n}"));
        std::path::PathBuf::from(name)
    };

    // The oldest backup falls off the end.
    let _ = std::fs::remove_file(numbered(keep));

    for n in (1..keep).rev() {
        let _ = std::fs::rename(numbered(n), numbered(n + 1));
    }

    // Live log becomes `.1`
    if base_path.exists() {
        let _ = std::fs::rename(base_path, numbered(1));
    }
}

/// Log sink that flushes the file after every write.
///
/// A killed process (Ctrl-C mid-stream is common) keeps every line logged so far.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }

    fn lock(&self) -> std::io::Result<std::sync::MutexGuard<'_, std::fs::File>> {
        self.file
            .lock()
            .map_err(|e| std::io::Error::other(format!("log file lock poisoned: {e}")))
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self.lock()?;
        let written = file.write(buf)?;
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.lock()?.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
