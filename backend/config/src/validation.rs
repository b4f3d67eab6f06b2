//! Options validation with field paths and user-friendly messages.

use crate::schema::Options;
use logtee_core::LogError;
use thiserror::Error;

/// One validation finding.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl From<ConfigValidationError> for LogError {
    fn from(err: ConfigValidationError) -> Self {
        LogError::Config(err.to_string())
    }
}

/// Everything found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate `options`. Errors make a pipeline unbuildable; warnings describe
/// settings that are legal but probably not what was meant.
pub fn validate(options: &Options) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !options.stdout && !options.has_file() {
        report.warn("stdout", "stdout is disabled and no filename is set; entries will be discarded");
    }

    if let Some(path) = options.file_path() {
        if path.file_name().is_none() {
            report.error("filename", format!("{} does not name a file", path.display()));
        } else if path.is_dir() {
            report.error("filename", format!("{} is a directory", path.display()));
        }
    } else {
        for (field, set) in [
            ("maxSize", options.max_size > 0),
            ("maxBackups", options.max_backups > 0),
            ("maxAge", options.max_age > 0),
            ("compress", options.compress),
        ] {
            if set {
                report.warn(field, "has no effect without a filename");
            }
        }
    }

    if options.max_size > 0 && options.max_size_bytes().is_none() {
        report.error("maxSize", "too large to express in bytes");
    }

    if let Some(stack) = options.stacktrace_level {
        if stack < options.level {
            report.warn(
                "stacktraceLevel",
                format!(
                    "below the minimum level {}; only entries at {} or above are emitted",
                    options.level, options.level
                ),
            );
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_options;
    use logtee_core::Level;

    #[test]
    fn warns_on_unreachable_stacktrace_level() {
        let opts = Options {
            level: Level::Warn,
            stacktrace_level: Some(Level::Debug),
            ..Default::default()
        };
        let report = validate(&opts);
        assert_eq!(report.warnings[0].path, "stacktraceLevel");
    }

    #[test]
    fn defaults_are_valid_and_quiet() {
        let report = validate(&default_options("app.log"));
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn warns_when_everything_is_discarded() {
        let opts = Options {
            stdout: false,
            ..Default::default()
        };
        let report = validate(&opts);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "stdout");
    }

    #[test]
    fn warns_on_rotation_settings_without_file() {
        let opts = Options {
            max_size: 10,
            compress: true,
            ..Default::default()
        };
        let report = validate(&opts);
        let paths: Vec<_> = report.warnings.iter().map(|w| w.path.as_str()).collect();
        assert!(paths.contains(&"maxSize"));
        assert!(paths.contains(&"compress"));
    }

    #[test]
    fn directory_filename_is_an_error() {
        let dir = std::env::temp_dir();
        let opts = Options {
            filename: dir.display().to_string(),
            ..Default::default()
        };
        assert!(!validate(&opts).is_valid());
    }

    #[test]
    fn converts_into_log_error() {
        let opts = Options {
            max_size: u64::MAX,
            filename: "a.log".into(),
            ..Default::default()
        };
        let err: LogError = validate(&opts).errors.remove(0).into();
        assert!(matches!(err, LogError::Config(_)));
    }
}
