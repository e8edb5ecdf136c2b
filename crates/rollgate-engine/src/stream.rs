//! NDJSON pull-progress decoding.
//!
//! The image-create endpoint streams one JSON object per line, with chunk
//! boundaries landing anywhere. `LineBuffer` reassembles complete lines
//! across chunks, carrying a trailing partial line into the next push.
//! Independent of any I/O framework; the client feeds it raw body frames.

use serde::Deserialize;

/// Status prefixes worth logging. Everything else (per-layer Downloading /
/// Extracting / Waiting noise) is suppressed; a typical 20-layer image
/// emits 100+ progress lines without this filter.
pub const PULL_LOG_PREFIXES: [&str; 5] = [
    "Pulling from",
    "Pull complete",
    "Already exists",
    "Digest:",
    "Status:",
];

/// Whether a pull status line is on the high-signal allow-list.
pub fn is_high_signal_status(status: &str) -> bool {
    PULL_LOG_PREFIXES.iter().any(|p| status.starts_with(p))
}

/// One decoded progress event from the pull stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullEvent {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Parse one NDJSON line. Malformed or non-object lines yield `None` and
/// are skipped by the caller.
pub fn parse_pull_event(line: &str) -> Option<PullEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Accumulating byte buffer with a newline splitter.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every line completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned());
        }
        lines
    }

    /// Drain the trailing partial line, if any. The stream is finite and
    /// non-restartable; call once at end of body.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}
