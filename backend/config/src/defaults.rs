//! Default values for file-backed pipelines.

use crate::schema::Options;
use logtee_core::Level;

/// Default rotation threshold, in megabytes.
pub const DEFAULT_MAX_SIZE_MB: u64 = 100;

/// Default number of rotated files kept.
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Default retention for rotated files, in days.
pub const DEFAULT_MAX_AGE_DAYS: u32 = 30;

/// Options for a pipeline writing to `filename` (and stdout): 100 MB files,
/// 10 backups, 30 days of retention, no compression, Info level.
pub fn default_options(filename: impl Into<String>) -> Options {
    Options {
        filename: filename.into(),
        level: Level::Info,
        max_size: DEFAULT_MAX_SIZE_MB,
        max_backups: DEFAULT_MAX_BACKUPS,
        max_age: DEFAULT_MAX_AGE_DAYS,
        compress: false,
        ..Options::default()
    }
}
