//! Background gzip compression of rotated files.
//!
//! One worker thread per rotating file, started on first use. A file is
//! compressed to `<name>.gz.tmp`, renamed to `<name>.gz`, and only then is the
//! original removed, so a failure at any step leaves the uncompressed backup
//! in place.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use flate2::Compression;
use flate2::write::GzEncoder;
use logtee_core::LogError;
use parking_lot::Mutex;

use crate::diagnostics::Diagnostics;

pub(crate) const GZ_EXT: &str = ".gz";

pub(crate) fn gz_path(src: &Path) -> PathBuf {
    let mut name = src.as_os_str().to_os_string();
    name.push(GZ_EXT);
    PathBuf::from(name)
}

/// Compress `src` next to itself and remove it. Returns the `.gz` path.
pub(crate) fn compress_file(src: &Path) -> io::Result<PathBuf> {
    let dst = gz_path(src);
    let mut tmp = dst.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = (|| {
        let mut input = BufReader::new(File::open(src)?);
        let mut encoder = GzEncoder::new(File::create(&tmp)?, Compression::default());
        io::copy(&mut input, &mut encoder)?;
        encoder.finish()?.sync_all()?;
        fs::rename(&tmp, &dst)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = fs::remove_file(src) {
        // Retention removed the source meanwhile; drop the copy as well.
        if e.kind() == io::ErrorKind::NotFound {
            let _ = fs::remove_file(&dst);
        }
        return Err(e);
    }
    Ok(dst)
}

pub(crate) struct Compressor {
    tx: Mutex<Option<Sender<PathBuf>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<Mutex<HashSet<PathBuf>>>,
    closed: Mutex<bool>,
    diagnostics: Diagnostics,
}

impl Compressor {
    pub(crate) fn new(diagnostics: Diagnostics) -> Self {
        Self {
            tx: Mutex::new(None),
            worker: Mutex::new(None),
            pending: Arc::new(Mutex::new(HashSet::new())),
            closed: Mutex::new(false),
            diagnostics,
        }
    }

    /// Queue `path` for compression. Already-queued paths are ignored. After
    /// [`Compressor::shutdown`] the work is done inline.
    pub(crate) fn submit(&self, path: PathBuf) {
        if !self.pending.lock().insert(path.clone()) {
            return;
        }

        let path = match self.sender() {
            Some(tx) => match tx.send(path) {
                Ok(()) => return,
                Err(mpsc::SendError(path)) => path,
            },
            None => path,
        };
        run_job(&path, &self.pending, &self.diagnostics);
    }

    fn sender(&self) -> Option<Sender<PathBuf>> {
        if *self.closed.lock() {
            return None;
        }
        let mut tx = self.tx.lock();
        if let Some(tx) = tx.as_ref() {
            return Some(tx.clone());
        }

        let (new_tx, rx) = mpsc::channel::<PathBuf>();
        let pending = self.pending.clone();
        let diagnostics = self.diagnostics.clone();
        let spawned = thread::Builder::new()
            .name("logtee-compress".into())
            .spawn(move || {
                for path in rx {
                    run_job(&path, &pending, &diagnostics);
                }
            });

        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                *tx = Some(new_tx.clone());
                Some(new_tx)
            }
            Err(e) => {
                tracing::warn!(target: "logtee", "Could not start compression worker: {e}");
                None
            }
        }
    }

    /// Stop accepting background work and wait for the queue to drain.
    pub(crate) fn shutdown(&self) {
        *self.closed.lock() = true;
        drop(self.tx.lock().take());
        if let Some(handle) = self.worker.lock().take() {
            report_worker_exit(handle.join(), &self.pending, &self.diagnostics);
        }
    }
}

/// A panicked worker leaves its unfinished paths in `pending`; each one is
/// reported and forgotten so a later submit can queue it again.
fn report_worker_exit(
    exit: thread::Result<()>,
    pending: &Mutex<HashSet<PathBuf>>,
    diagnostics: &Diagnostics,
) {
    if exit.is_ok() {
        return;
    }
    tracing::warn!(target: "logtee", "Compression worker panicked");
    for path in pending.lock().drain() {
        let err = io::Error::other("compression worker panicked");
        diagnostics.report(&LogError::rotation(path, "compressing", err));
    }
}

impl Drop for Compressor {
    fn drop(&mut self) {
        // Let the worker finish its queue on its own.
        drop(self.tx.lock().take());
    }
}

fn run_job(path: &Path, pending: &Mutex<HashSet<PathBuf>>, diagnostics: &Diagnostics) {
    if path.exists() {
        match compress_file(path) {
            Ok(dst) => {
                tracing::debug!(target: "logtee", src = %path.display(), dst = %dst.display(), "Compressed backup");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => diagnostics.report(&LogError::rotation(path, "compressing", e)),
        }
    }
    pending.lock().remove(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(path: &Path) -> String {
        let mut out = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn panicked_worker_reports_unfinished_paths() {
        let mem = crate::sink::MemorySink::new();
        let diagnostics = Diagnostics::to_writer(mem.clone());
        let pending = Mutex::new(HashSet::from([PathBuf::from("/logs/app-1.log")]));

        report_worker_exit(Ok(()), &pending, &diagnostics);
        assert!(mem.contents().is_empty());
        assert_eq!(pending.lock().len(), 1);

        let exit: thread::Result<()> = Err(Box::new("gzip blew up"));
        report_worker_exit(exit, &pending, &diagnostics);
        let lines = mem.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("app-1.log") && lines[0].contains("worker panicked"));
        assert!(pending.lock().is_empty());
    }

    #[test]
    fn compresses_and_removes_original() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("app-2024-01-01T00-00-00.000.log");
        fs::write(&src, "line one\nline two\n").unwrap();

        let dst = compress_file(&src).unwrap();
        assert!(!src.exists());
        assert_eq!(dst, dir.path().join("app-2024-01-01T00-00-00.000.log.gz"));
        assert_eq!(gunzip(&dst), "line one\nline two\n");
    }

    #[test]
    fn failed_compression_keeps_nothing_partial() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("missing.log");
        assert!(compress_file(&src).is_err());
        assert!(!gz_path(&src).exists());
    }

    #[test]
    fn worker_drains_queue_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let compressor = Compressor::new(Diagnostics::to_writer(io::sink()));
        let files: Vec<_> = (0..3)
            .map(|i| {
                let p = dir.path().join(format!("b{i}.log"));
                fs::write(&p, format!("backup {i}\n")).unwrap();
                p
            })
            .collect();
        for f in &files {
            compressor.submit(f.clone());
        }
        compressor.shutdown();

        for (i, f) in files.iter().enumerate() {
            assert!(!f.exists());
            assert_eq!(gunzip(&gz_path(f)), format!("backup {i}\n"));
        }
    }

    #[test]
    fn compresses_inline_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let compressor = Compressor::new(Diagnostics::to_writer(io::sink()));
        compressor.shutdown();

        let p = dir.path().join("late.log");
        fs::write(&p, "late\n").unwrap();
        compressor.submit(p.clone());
        assert!(gz_path(&p).exists());
    }
}
