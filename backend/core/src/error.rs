use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the logging pipeline.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("logger is not initialized: call init_pipeline first")]
    NotInitialized,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("write to {sink} sink failed: {source}")]
    Write {
        sink: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("rotation of {path} failed while {action}: {source}")]
    Rotation {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("hook '{hook}' failed: {reason}")]
    Hook { hook: String, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LogError {
    pub fn write(sink: &'static str, source: io::Error) -> Self {
        Self::Write { sink, source }
    }

    pub fn rotation(path: impl Into<PathBuf>, action: &'static str, source: io::Error) -> Self {
        Self::Rotation {
            path: path.into(),
            action,
            source,
        }
    }

    /// Short category label used by the diagnostic channel.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotInitialized | Self::Config(_) => "config",
            Self::Write { .. } | Self::Io(_) => "write",
            Self::Rotation { .. } => "rotation",
            Self::Hook { .. } => "hook",
        }
    }
}

impl From<LogError> for io::Error {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Write { source, .. } | LogError::Io(source) => source,
            other => io::Error::other(other),
        }
    }
}
