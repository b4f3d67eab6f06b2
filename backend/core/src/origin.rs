//! Call-site attribution.
//!
//! File and line come from `#[track_caller]`: every function on the path from a
//! public emission entry point down to [`Origin::caller`] carries the attribute,
//! so `Location::caller()` resolves to the user's own call site. Any function on
//! that path missing the attribute would silently attribute every entry to the
//! logger's internals; `CALLER_SKIP` records that no such frame is tolerated and
//! the per-surface tests in the `logtee` crate pin it down.
//!
//! Stack text is a full backtrace with the logger's own frames trimmed off the
//! top, followed by `CALLER_SKIP` further frames.

use std::fmt::Write as _;
use std::panic::Location;

/// Unannotated frames between the user's call site and the capture point.
pub const CALLER_SKIP: usize = 0;

/// Symbol prefixes treated as logger-internal when trimming a stack.
pub const STACK_SKIP_PREFIXES: &[&str] = &[
    "backtrace::",
    "<backtrace::",
    "logtee_core::",
    "<logtee_core::",
    "logtee::",
    "<logtee::",
];

/// Source location of a log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub file: &'static str,
    pub line: u32,
}

impl Origin {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Location of whoever called the outermost `#[track_caller]` function.
    #[track_caller]
    #[inline]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&'static Location<'static>> for Origin {
    fn from(loc: &'static Location<'static>) -> Self {
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

fn is_internal(symbol: &str) -> bool {
    STACK_SKIP_PREFIXES.iter().any(|p| symbol.starts_with(p))
}

/// Capture the current stack as text, one `function\n\tfile:line` per frame.
///
/// Leading logger frames are dropped, then `skip` more frames.
pub fn capture_stack(skip: usize) -> String {
    let bt = backtrace::Backtrace::new();
    let mut out = String::new();
    let mut trimming = true;
    let mut skipped = 0;

    for frame in bt.frames() {
        for symbol in frame.symbols() {
            let name = symbol
                .name()
                .map(|n| format!("{n:#}"))
                .unwrap_or_else(|| "<unknown>".to_string());

            if trimming && is_internal(&name) {
                continue;
            }
            trimming = false;
            if skipped < skip {
                skipped += 1;
                continue;
            }

            let _ = writeln!(out, "{name}");
            if let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) {
                let _ = writeln!(out, "\t{}:{}", file.display(), line);
            }
        }
    }

    out.truncate(out.trim_end().len());
    out
}
