//! Named loggers with bound fields.
//!
//! Every emission method is `#[track_caller]` all the way down to
//! [`Origin::caller`], so entries carry the caller's file and line.

use std::fmt::{self, Display};
use std::sync::Arc;

use logtee_core::{CALLER_SKIP, Field, Level, LogEntry, LogError, Origin, capture_stack};

use crate::filter::Core;

/// Displays its arguments separated by single spaces.
pub struct Joined<'a>(pub &'a [&'a dyn Display]);

impl Display for Joined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            arg.fmt(f)?;
        }
        Ok(())
    }
}

/// A handle onto a pipeline's core with a name and fields of its own.
/// Cheap to clone.
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    name: String,
    fields: Vec<Field>,
}

impl Logger {
    pub fn new(core: Arc<Core>) -> Self {
        Self {
            core,
            name: String::new(),
            fields: Vec::new(),
        }
    }

    /// Child logger. Names nest with `.`.
    pub fn named(&self, name: &str) -> Self {
        let mut child = self.clone();
        child.name = match (self.name.is_empty(), name.is_empty()) {
            (_, true) => self.name.clone(),
            (true, false) => name.to_string(),
            (false, false) => format!("{}.{}", self.name, name),
        };
        child
    }

    /// Child logger that adds `fields` to every entry.
    pub fn with_fields(&self, fields: impl IntoIterator<Item = Field>) -> Self {
        let mut child = self.clone();
        child.fields.extend(fields);
        child
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.core.accept(level)
    }

    /// Emit and return the write outcome instead of reporting it.
    #[track_caller]
    pub fn try_log(
        &self,
        level: Level,
        msg: impl Display,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<(), LogError> {
        if !self.core.wants_entry(level) {
            return Ok(());
        }
        let entry = self.entry(level, msg.to_string(), fields);
        self.core.emit(&entry)
    }

    #[track_caller]
    pub fn try_logf(&self, level: Level, args: fmt::Arguments<'_>) -> Result<(), LogError> {
        if !self.core.wants_entry(level) {
            return Ok(());
        }
        let entry = self.entry(level, fmt::format(args), []);
        self.core.emit(&entry)
    }

    #[track_caller]
    pub fn log(&self, level: Level, msg: impl Display) {
        let result = self.try_log(level, msg, []);
        self.report(result);
    }

    #[track_caller]
    pub fn logf(&self, level: Level, args: fmt::Arguments<'_>) {
        let result = self.try_logf(level, args);
        self.report(result);
    }

    #[track_caller]
    pub fn logw(&self, level: Level, msg: impl Display, fields: impl IntoIterator<Item = Field>) {
        let result = self.try_log(level, msg, fields);
        self.report(result);
    }

    pub fn sync(&self) -> Result<(), LogError> {
        self.core.sync()
    }

    /// Emit with an origin supplied by the caller, for events that carry
    /// their own source location.
    pub fn log_at(
        &self,
        origin: Origin,
        level: Level,
        msg: impl Display,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<(), LogError> {
        if !self.core.wants_entry(level) {
            return Ok(());
        }
        let entry = self.entry_at(origin, level, msg.to_string(), fields);
        self.core.emit(&entry)
    }

    #[track_caller]
    fn entry(
        &self,
        level: Level,
        message: String,
        fields: impl IntoIterator<Item = Field>,
    ) -> LogEntry {
        self.entry_at(Origin::caller(), level, message, fields)
    }

    fn entry_at(
        &self,
        origin: Origin,
        level: Level,
        message: String,
        fields: impl IntoIterator<Item = Field>,
    ) -> LogEntry {
        // Called directly so no adapter frame sits between here and the capture.
        let stack = if self.core.wants_stack(level) {
            Some(capture_stack(CALLER_SKIP))
        } else {
            None
        };
        LogEntry::new(level, message, origin)
            .with_logger_name(self.name.clone())
            .with_fields(self.fields.iter().cloned().chain(fields))
            .with_stack(stack)
    }

    fn report(&self, result: Result<(), LogError>) {
        if let Err(e) = result {
            self.core.diagnostics().report(&e);
        }
    }
}

macro_rules! level_methods {
    ($($level:ident => $plain:ident, $template:ident, $keyed:ident;)*) => {
        impl Logger {
            $(
                #[track_caller]
                pub fn $plain(&self, msg: impl Display) {
                    self.log(Level::$level, msg)
                }

                #[track_caller]
                pub fn $template(&self, args: fmt::Arguments<'_>) {
                    self.logf(Level::$level, args)
                }

                #[track_caller]
                pub fn $keyed(&self, msg: impl Display, fields: impl IntoIterator<Item = Field>) {
                    self.logw(Level::$level, msg, fields)
                }
            )*
        }
    };
}

level_methods! {
    Debug => debug, debugf, debugw;
    Info => info, infof, infow;
    Warn => warn, warnf, warnw;
    Error => error, errorf, errorw;
    DPanic => dpanic, dpanicf, dpanicw;
    Panic => panic, panicf, panicw;
    Fatal => fatal, fatalf, fatalw;
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
