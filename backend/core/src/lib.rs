pub mod entry;
pub mod error;
pub mod level;
pub mod origin;

pub use entry::{Field, LogEntry};
pub use error::LogError;
pub use level::{Level, ParseLevelError};
pub use origin::{capture_stack, Origin, CALLER_SKIP};
