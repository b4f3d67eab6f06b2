//! Fallback channel for failures that must not reach the caller.
//!
//! Rotation failures, hook failures and secondary sink failures are written
//! here as one line each (stderr unless replaced) and mirrored as `tracing`
//! warnings under the `logtee` target.

use std::io::{self, Write};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use logtee_core::LogError;
use parking_lot::Mutex;

#[derive(Clone)]
pub struct Diagnostics {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Diagnostics {
    pub fn stderr() -> Self {
        Self::to_writer(io::stderr())
    }

    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn report(&self, err: &LogError) {
        tracing::warn!(target: "logtee", kind = err.kind(), "{err}");

        let line = format!(
            "{} logtee {} error: {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            err.kind(),
            err
        );
        let mut out = self.out.lock();
        let _ = out.write_all(line.as_bytes());
        let _ = out.flush();
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::stderr()
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}
