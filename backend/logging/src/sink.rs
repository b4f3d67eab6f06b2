//! Write endpoints and the fan-out set built from them.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use logtee_core::LogError;
use parking_lot::Mutex;

use crate::diagnostics::Diagnostics;

/// A destination for encoded bytes. Each sink serializes its own writes.
pub trait Sink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write the whole buffer as one unit.
    fn write_all(&self, buf: &[u8]) -> io::Result<()>;

    fn sync(&self) -> io::Result<()>;
}

/// Process standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(buf)?;
        out.flush()
    }

    fn sync(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Adapts any `io::Write` into a sink.
pub struct WriterSink<W> {
    name: &'static str,
    inner: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(name: &'static str, writer: W) -> Self {
        Self {
            name,
            inner: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.inner.lock().write_all(buf)
    }

    fn sync(&self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// Shared in-memory buffer. Clones see the same bytes.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.buf.lock().clear();
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.buf.lock().extend_from_slice(buf);
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Which endpoints a [`SinkSet`] fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    None,
    Stdout,
    File,
    Tee,
}

impl SinkKind {
    pub fn select(stdout: bool, file: bool) -> Self {
        match (stdout, file) {
            (true, true) => Self::Tee,
            (true, false) => Self::Stdout,
            (false, true) => Self::File,
            (false, false) => Self::None,
        }
    }
}

/// The active endpoints of a pipeline. Fixed once built.
pub struct SinkSet {
    sinks: Vec<Arc<dyn Sink>>,
    kind: SinkKind,
    diagnostics: Diagnostics,
}

impl SinkSet {
    /// Stdout first, then file. Either may be absent.
    pub fn select(
        stdout: Option<Arc<dyn Sink>>,
        file: Option<Arc<dyn Sink>>,
        diagnostics: Diagnostics,
    ) -> Self {
        let kind = SinkKind::select(stdout.is_some(), file.is_some());
        Self {
            sinks: stdout.into_iter().chain(file).collect(),
            kind,
            diagnostics,
        }
    }

    pub fn empty(diagnostics: Diagnostics) -> Self {
        Self::select(None, None, diagnostics)
    }

    pub fn kind(&self) -> SinkKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Write `buf` to every sink. All sinks are attempted; the first failure
    /// is returned and later ones go to the diagnostic channel.
    pub fn write(&self, buf: &[u8]) -> Result<(), LogError> {
        let mut first = None;
        for sink in &self.sinks {
            if let Err(e) = sink.write_all(buf) {
                let err = LogError::write(sink.name(), e);
                if first.is_none() {
                    first = Some(err);
                } else {
                    self.diagnostics.report(&err);
                }
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Flush every sink, same error policy as [`SinkSet::write`].
    pub fn sync(&self) -> Result<(), LogError> {
        let mut first = None;
        for sink in &self.sinks {
            if let Err(e) = sink.sync() {
                let err = LogError::write(sink.name(), e);
                if first.is_none() {
                    first = Some(err);
                } else {
                    self.diagnostics.report(&err);
                }
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("SinkSet")
            .field("kind", &self.kind)
            .field("sinks", &names)
            .finish()
    }
}

/// `io::Write` handle onto a pipeline's sinks. Every `write` call reaches all
/// sinks as one unit.
#[derive(Debug, Clone)]
pub struct SinkWriter {
    sinks: Arc<SinkSet>,
}

impl SinkWriter {
    pub fn new(sinks: Arc<SinkSet>) -> Self {
        Self { sinks }
    }

    pub fn kind(&self) -> SinkKind {
        self.sinks.kind()
    }
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sinks.write(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sinks.sync().map_err(io::Error::from)
    }
}
