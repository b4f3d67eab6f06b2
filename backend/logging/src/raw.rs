//! Raw channel: caller bytes straight to the sinks.
//!
//! No level filter, no encoding, no hooks. Rotation and fan-out still apply
//! because the bytes go through the same [`SinkSet`](crate::sink::SinkSet).

use std::fmt::{self, Display};

use logtee_core::LogError;

use crate::logger::Joined;
use crate::pipeline::{Pipeline, current};

impl Pipeline {
    pub fn write_raw(&self, buf: &[u8]) -> Result<(), LogError> {
        self.core().sinks().write(buf)
    }

    pub fn write_raw_fmt(&self, args: fmt::Arguments<'_>) -> Result<(), LogError> {
        match args.as_str() {
            Some(s) => self.write_raw(s.as_bytes()),
            None => self.write_raw(fmt::format(args).as_bytes()),
        }
    }
}

/// Write `buf` verbatim through the active pipeline's sinks.
pub fn write_raw(buf: &[u8]) -> Result<(), LogError> {
    current().write_raw(buf)
}

pub fn write_raw_fmt(args: fmt::Arguments<'_>) -> Result<(), LogError> {
    current().write_raw_fmt(args)
}

#[doc(hidden)]
pub fn __pure(args: &[&dyn Display]) {
    let line = format!("{}\n", Joined(args));
    write_line(&line);
}

#[doc(hidden)]
pub fn __puref(args: fmt::Arguments<'_>) {
    let line = format!("{args}\n");
    write_line(&line);
}

fn write_line(line: &str) {
    let pipeline = current();
    if let Err(e) = pipeline.write_raw(line.as_bytes()) {
        pipeline.diagnostics().report(&e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use logtee_config::Options;
    use logtee_hooks::LevelCounterHook;
    use std::sync::Arc;

    #[test]
    fn raw_bypasses_filter_encoding_and_hooks() {
        let out = MemorySink::new();
        let counter = Arc::new(LevelCounterHook::new());
        let pipeline = Pipeline::builder(Options {
            level: logtee_core::Level::Fatal,
            ..Options::default()
        })
        .stdout_sink(Arc::new(out.clone()))
        .hook(counter.clone())
        .build()
        .unwrap();

        pipeline.write_raw(b"verbatim").unwrap();
        pipeline
            .write_raw_fmt(format_args!(" {}-{}\n", "x", 2))
            .unwrap();

        assert_eq!(out.contents(), "verbatim x-2\n");
        assert_eq!(counter.total(), 0);
    }
}
