//! Structured logging with stdout/file fan-out, rotation and hooks.
//!
//! An entry passes the level filter, is encoded once, written to every sink
//! (stdout, a size-rotated file, or both) and then handed to each registered
//! hook. The raw channel writes caller bytes to the same sinks without any of
//! that.
//!
//! ```no_run
//! use logtee::{default_options, init_pipeline, infow};
//!
//! init_pipeline(default_options("logs/app.log"), []).unwrap();
//! infow!("listening", "port" => 8080);
//! logtee::pure!("raw", 1, "line");
//! ```

pub mod bridge;
mod compress;
pub mod diagnostics;
pub mod encoder;
pub mod filter;
pub mod logger;
mod macros;
pub mod pipeline;
pub mod raw;
pub mod redact;
pub mod rotation;
pub mod sink;

pub use bridge::{TracingBridge, init_tracing_bridge};
pub use diagnostics::Diagnostics;
pub use encoder::{ConsoleFormatter, Formatter, JsonFormatter};
pub use filter::{Core, ExitFn};
pub use logger::{Joined, Logger};
pub use pipeline::{
    Pipeline, PipelineBuilder, current, get_writer, init_from_file, init_pipeline,
    is_initialized, log, logf, logger, logw, shutdown, sync,
};
pub use raw::{write_raw, write_raw_fmt};
pub use redact::{RedactingFormatter, redact_sensitive_data};
pub use rotation::{Backup, RotatingFile, RotationPolicy};
pub use sink::{MemorySink, Sink, SinkKind, SinkSet, SinkWriter, StdoutSink, WriterSink};

pub use logtee_config::{Options, OutputFormat, default_options};
pub use logtee_core::{CALLER_SKIP, Field, Level, LogEntry, LogError, Origin};
pub use logtee_hooks::{ChannelHook, FnHook, Hook, HookPipeline, LevelCounterHook, hook_fn};
