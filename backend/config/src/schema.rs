//! logtee configuration schema.

use logtee_core::Level;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// How entries are encoded before they reach the sinks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated human-readable lines.
    #[default]
    Console,
    /// One JSON object per line.
    Json,
}

/// Everything needed to build a pipeline. Immutable once a pipeline has been
/// built from it; changing behaviour means building a new pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Write to standard output.
    pub stdout: bool,

    /// Minimum level that reaches the sinks and hooks.
    pub level: Level,

    /// Log file path. Empty means no file sink.
    pub filename: String,

    /// Rotate once the active file reaches this many megabytes. 0 never rotates.
    pub max_size: u64,

    /// Rotated files to keep. 0 keeps all of them (age still applies).
    pub max_backups: usize,

    /// Days to keep rotated files, judged by the timestamp in their name. 0 keeps them forever.
    pub max_age: u32,

    /// Gzip rotated files in the background.
    pub compress: bool,

    /// Name of the root logger, printed next to the caller when non-empty.
    pub name: String,

    pub format: OutputFormat,

    /// Development mode makes `DPanic` entries panic after they are written.
    pub development: bool,

    /// Attach a stack trace to entries at or above this level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace_level: Option<Level>,

    /// Use local time instead of UTC in backup file names.
    pub local_time: bool,

    /// Scrub tokens, API keys and phone numbers from messages before encoding.
    pub redact: bool,
}

impl Default for Options {
    /// Stdout-only at Debug level: the pipeline in effect before `init_pipeline`.
    fn default() -> Self {
        Self {
            stdout: true,
            level: Level::Debug,
            filename: String::new(),
            max_size: 0,
            max_backups: 0,
            max_age: 0,
            compress: false,
            name: String::new(),
            format: OutputFormat::Console,
            development: false,
            stacktrace_level: None,
            local_time: false,
            redact: false,
        }
    }
}

impl Options {
    pub fn has_file(&self) -> bool {
        !self.filename.trim().is_empty()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.has_file().then(|| Path::new(self.filename.as_str()))
    }

    /// `max_size` in bytes, or `None` when rotation is disabled or the
    /// value does not fit in a `u64`.
    pub fn max_size_bytes(&self) -> Option<u64> {
        self.max_size.checked_mul(BYTES_PER_MB).filter(|n| *n > 0)
    }
}
