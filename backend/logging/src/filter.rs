//! Level filter plus encode, write and notify.

use std::fmt;
use std::sync::Arc;

use logtee_core::{Level, LogEntry, LogError};
use logtee_hooks::HookPipeline;

use crate::diagnostics::Diagnostics;
use crate::encoder::Formatter;
use crate::sink::SinkSet;

/// Called with the exit status after a Fatal entry. `std::process::exit` unless
/// replaced.
pub type ExitFn = Arc<dyn Fn(i32) + Send + Sync>;

pub(crate) fn process_exit() -> ExitFn {
    Arc::new(|code| std::process::exit(code))
}

pub struct Core {
    min_level: Level,
    formatter: Box<dyn Formatter>,
    sinks: Arc<SinkSet>,
    hooks: HookPipeline,
    diagnostics: Diagnostics,
    development: bool,
    stacktrace_level: Option<Level>,
    exit: ExitFn,
}

impl Core {
    pub fn new(
        min_level: Level,
        formatter: Box<dyn Formatter>,
        sinks: Arc<SinkSet>,
        hooks: HookPipeline,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            min_level,
            formatter,
            sinks,
            hooks,
            diagnostics,
            development: false,
            stacktrace_level: None,
            exit: process_exit(),
        }
    }

    pub fn with_development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    pub fn with_stacktrace_level(mut self, level: Option<Level>) -> Self {
        self.stacktrace_level = level;
        self
    }

    pub fn with_exit(mut self, exit: ExitFn) -> Self {
        self.exit = exit;
        self
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn accept(&self, level: Level) -> bool {
        level.enabled_at(self.min_level)
    }

    /// Whether an entry at `level` ends the call by panicking or exiting.
    pub fn terminates(&self, level: Level) -> bool {
        match level {
            Level::DPanic => self.development,
            Level::Panic | Level::Fatal => true,
            _ => false,
        }
    }

    /// Whether an entry at `level` has to be built at all: it is either
    /// written or it terminates.
    pub fn wants_entry(&self, level: Level) -> bool {
        self.accept(level) || self.terminates(level)
    }

    /// Whether entries at `level` carry a stack.
    pub fn wants_stack(&self, level: Level) -> bool {
        self.stacktrace_level.is_some_and(|min| level >= min)
    }

    pub fn sinks(&self) -> &Arc<SinkSet> {
        &self.sinks
    }

    pub fn hooks(&self) -> &HookPipeline {
        &self.hooks
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Filter, encode, write, then notify hooks whatever the write outcome.
    ///
    /// Hook failures go to the diagnostic channel. The returned error is the
    /// write error, if any. DPanic (in development), Panic and Fatal entries
    /// terminate only after all of that has happened, and terminate even when
    /// the filter drops them.
    pub fn emit(&self, entry: &LogEntry) -> Result<(), LogError> {
        if !self.accept(entry.level) {
            self.terminate(entry);
            return Ok(());
        }

        let mut buf = Vec::with_capacity(256);
        self.formatter.format(entry, &mut buf);
        let written = self.sinks.write(&buf);

        for failure in self.hooks.notify(entry) {
            self.diagnostics.report(&failure.into());
        }

        self.terminate(entry);
        written
    }

    pub fn sync(&self) -> Result<(), LogError> {
        self.sinks.sync()
    }

    fn terminate(&self, entry: &LogEntry) {
        match entry.level {
            Level::DPanic if self.development => std::panic!("{}", entry.message),
            Level::Panic => std::panic!("{}", entry.message),
            Level::Fatal => {
                if let Err(e) = self.sinks.sync() {
                    self.diagnostics.report(&e);
                }
                (self.exit)(1);
            }
            _ => {}
        }
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("min_level", &self.min_level)
            .field("sinks", &self.sinks)
            .field("hooks", &self.hooks.names())
            .field("development", &self.development)
            .field("stacktrace_level", &self.stacktrace_level)
            .finish_non_exhaustive()
    }
}
