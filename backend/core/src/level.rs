use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Logging priority. Higher levels are more important.
///
/// The derived `Ord` follows declaration order, so `Debug < Info < ... < Fatal`.
/// That ordering is the only level semantics the filter relies on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Voluminous diagnostics, usually disabled in production.
    #[default]
    Debug,
    /// The default logging priority.
    Info,
    /// More important than Info, but doesn't need individual human review.
    Warn,
    /// High-priority. A smoothly running application shouldn't emit these.
    Error,
    /// Particularly important errors. In development mode the logger panics
    /// after writing the entry.
    DPanic,
    /// Logs the entry, then panics.
    Panic,
    /// Logs the entry, then exits the process with status 1.
    Fatal,
}

impl Level {
    /// Every level, least severe first.
    pub const ALL: [Level; 7] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::DPanic,
        Level::Panic,
        Level::Fatal,
    ];

    /// Lowercase name, as used in config files and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::DPanic => "dpanic",
            Level::Panic => "panic",
            Level::Fatal => "fatal",
        }
    }

    /// Capitalized name, as written by the console formatter.
    pub fn capital(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::DPanic => "DPANIC",
            Level::Panic => "PANIC",
            Level::Fatal => "FATAL",
        }
    }

    /// Whether an entry at this level passes a filter set to `min`.
    #[inline]
    pub fn enabled_at(self, min: Level) -> bool {
        self >= min
    }

    /// Position in [`Level::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.capital())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" | "" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "dpanic" => Ok(Level::DPanic),
            "panic" => Ok(Level::Panic),
            "fatal" => Ok(Level::Fatal),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered_by_severity() {
        for pair in Level::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} should be below {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn enabled_at_uses_minimum() {
        assert!(!Level::Debug.enabled_at(Level::Info));
        assert!(Level::Info.enabled_at(Level::Info));
        assert!(Level::Fatal.enabled_at(Level::Info));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("DPanic".parse::<Level>().unwrap(), Level::DPanic);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Level::DPanic).unwrap();
        assert_eq!(json, "\"dpanic\"");
        let back: Level = serde_json::from_str("\"fatal\"").unwrap();
        assert_eq!(back, Level::Fatal);
    }
}
