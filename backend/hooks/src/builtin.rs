/// Built-in hook implementations.
///
/// Concrete `Hook`s that ship with logtee: closure adapter, a bounded hand-off
/// channel for pushing entries to a background consumer, per-level counters,
/// and a mirror into `tracing`.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use anyhow::{Result, bail};
use logtee_core::{Level, LogEntry};

use crate::registry::Hook;

// ---------------------------------------------------------------------------
// Closure hook
// ---------------------------------------------------------------------------

pub struct FnHook<F> {
    name: String,
    f: F,
}

impl<F> FnHook<F>
where
    F: Fn(&LogEntry) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Hook for FnHook<F>
where
    F: Fn(&LogEntry) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn observe(&self, entry: &LogEntry) -> Result<()> {
        (self.f)(entry)
    }
}

/// Wrap a closure as a shareable hook.
pub fn hook_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn Hook>
where
    F: Fn(&LogEntry) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnHook::new(name, f))
}

// ---------------------------------------------------------------------------
// Channel hook: hands entries to a consumer without blocking the emitter
// ---------------------------------------------------------------------------

/// Copies each entry into a bounded channel. When the consumer falls behind
/// the entry is dropped and the hook reports a failure instead of blocking.
pub struct ChannelHook {
    tx: SyncSender<LogEntry>,
}

impl ChannelHook {
    pub fn new(capacity: usize) -> (Self, Receiver<LogEntry>) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (Self { tx }, rx)
    }
}

impl Hook for ChannelHook {
    fn name(&self) -> &str {
        "channel_hook"
    }

    fn observe(&self, entry: &LogEntry) -> Result<()> {
        match self.tx.try_send(entry.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => bail!("consumer is behind; entry dropped"),
            Err(TrySendError::Disconnected(_)) => bail!("consumer has gone away"),
        }
    }
}

// ---------------------------------------------------------------------------
// Level counter hook
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct LevelCounterHook {
    counts: [AtomicU64; Level::ALL.len()],
}

impl LevelCounterHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, level: Level) -> u64 {
        self.counts[level.index()].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

impl Hook for LevelCounterHook {
    fn name(&self) -> &str {
        "level_counter_hook"
    }

    fn observe(&self, entry: &LogEntry) -> Result<()> {
        self.counts[entry.level.index()].fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tracing hook: mirrors entries as `tracing` events
// ---------------------------------------------------------------------------

/// Re-emits every entry as a `tracing` event under the `logtee::mirror` target.
pub struct TracingHook;

impl Hook for TracingHook {
    fn name(&self) -> &str {
        "tracing_hook"
    }

    fn observe(&self, e: &LogEntry) -> Result<()> {
        macro_rules! mirror {
            ($lvl:ident) => {
                tracing::$lvl!(
                    target: "logtee::mirror",
                    logger = %e.logger_name,
                    caller = %e.caller(),
                    "{}",
                    e.message
                )
            };
        }
        match e.level {
            Level::Debug => mirror!(debug),
            Level::Info => mirror!(info),
            Level::Warn => mirror!(warn),
            Level::Error | Level::DPanic | Level::Panic | Level::Fatal => mirror!(error),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtee_core::Origin;

    fn entry(level: Level) -> LogEntry {
        LogEntry::new(level, "payload", Origin::new("src/main.rs", 3))
    }

    #[test]
    fn channel_hook_forwards_entries() {
        let (hook, rx) = ChannelHook::new(4);
        hook.observe(&entry(Level::Warn)).unwrap();
        let got = rx.try_recv().unwrap();
        assert_eq!(got.level, Level::Warn);
        assert_eq!(got.message, "payload");
    }

    #[test]
    fn channel_hook_fails_instead_of_blocking_when_full() {
        let (hook, _rx) = ChannelHook::new(1);
        hook.observe(&entry(Level::Info)).unwrap();
        let err = hook.observe(&entry(Level::Info)).unwrap_err();
        assert!(err.to_string().contains("behind"));
    }

    #[test]
    fn channel_hook_reports_disconnected_consumer() {
        let (hook, rx) = ChannelHook::new(1);
        drop(rx);
        assert!(hook.observe(&entry(Level::Info)).is_err());
    }

    #[test]
    fn counter_tracks_levels() {
        let hook = LevelCounterHook::new();
        for level in [Level::Info, Level::Info, Level::Error] {
            hook.observe(&entry(level)).unwrap();
        }
        assert_eq!(hook.count(Level::Info), 2);
        assert_eq!(hook.count(Level::Error), 1);
        assert_eq!(hook.count(Level::Debug), 0);
        assert_eq!(hook.total(), 3);
    }

    #[test]
    fn tracing_hook_never_fails() {
        for level in Level::ALL {
            assert!(TracingHook.observe(&entry(level)).is_ok());
        }
    }
}
