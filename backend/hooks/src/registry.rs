/// Hook trait and hook failure type.
///
/// Hooks are side-effect observers of accepted log entries: pushing to a
/// queue, counting, mirroring into another system. They see the entry through
/// a shared reference and cannot alter what later hooks observe.
use anyhow::Result;
use logtee_core::{LogEntry, LogError};
use thiserror::Error;

/// An observer invoked once per accepted entry, on the emitting thread.
///
/// Hooks doing slow or blocking work (network push, disk) should hand the
/// entry off to their own worker instead of doing it inline.
pub trait Hook: Send + Sync {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Observe one entry. An error is reported and otherwise ignored.
    fn observe(&self, entry: &LogEntry) -> Result<()>;
}

/// A hook that returned an error or panicked.
#[derive(Debug, Clone, Error)]
#[error("hook '{hook}' failed: {reason}")]
pub struct HookError {
    pub hook: String,
    pub reason: String,
    pub panicked: bool,
}

impl From<HookError> for LogError {
    fn from(err: HookError) -> Self {
        LogError::Hook {
            hook: err.hook,
            reason: if err.panicked {
                format!("panicked: {}", err.reason)
            } else {
                err.reason
            },
        }
    }
}
