//! Size-rotated log file with count and age retention.
//!
//! The active file is renamed to `<stem>-<timestamp><ext>` once a write pushes
//! it to the size limit, and a fresh file is opened at the original path. The
//! timestamp in the name is the only record of when a backup was made;
//! retention sorts and ages backups by it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDateTime, SubsecRound, TimeZone, Utc};
use logtee_config::Options;
use logtee_core::LogError;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::compress::{Compressor, GZ_EXT, gz_path};
use crate::diagnostics::Diagnostics;
use crate::sink::Sink;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// When to rotate and what to keep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotationPolicy {
    /// Rotate once the file reaches this many bytes. `None` never rotates.
    pub max_size: Option<u64>,
    /// Backups to keep. 0 keeps all of them.
    pub max_backups: usize,
    /// Remove backups older than this. `None` keeps them forever.
    pub max_age: Option<Duration>,
    pub compress: bool,
    /// Stamp backup names in local time instead of UTC.
    pub local_time: bool,
}

impl RotationPolicy {
    pub fn from_options(options: &Options) -> Self {
        Self {
            max_size: options.max_size_bytes(),
            max_backups: options.max_backups,
            max_age: (options.max_age > 0).then(|| Duration::days(i64::from(options.max_age))),
            compress: options.compress,
            local_time: options.local_time,
        }
    }
}

/// A rotated file found next to the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    /// Parsed from the file name.
    pub created: DateTime<Utc>,
    pub compressed: bool,
}

/// Filesystem calls rotation depends on. Swapped out in tests to force
/// failures.
#[derive(Clone, Copy)]
struct FsOps {
    open: fn(&Path) -> io::Result<File>,
    rename: fn(&Path, &Path) -> io::Result<()>,
    sync: fn(&File) -> io::Result<()>,
}

impl Default for FsOps {
    fn default() -> Self {
        Self {
            open: open_append,
            rename: |from, to| fs::rename(from, to),
            sync: File::sync_all,
        }
    }
}

#[derive(Default)]
struct State {
    file: Option<File>,
    size: u64,
    backups: Vec<Backup>,
    last_stamp: Option<DateTime<Utc>>,
}

pub struct RotatingFile {
    path: PathBuf,
    /// `<stem>-`
    prefix: String,
    /// `.log`, or empty when the file has no extension.
    ext: String,
    policy: RotationPolicy,
    state: Mutex<State>,
    compressor: Compressor,
    diagnostics: Diagnostics,
    fs: FsOps,
}

impl RotatingFile {
    /// Nothing is opened until the first write.
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy, diagnostics: Diagnostics) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Self {
            prefix: format!("{stem}-"),
            ext,
            path,
            policy,
            state: Mutex::new(State::default()),
            compressor: Compressor::new(diagnostics.clone()),
            diagnostics,
            fs: FsOps::default(),
        }
    }

    #[cfg(test)]
    fn with_fs(mut self, fs: FsOps) -> Self {
        self.fs = fs;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Bytes written to the active file since it was opened or last rotated.
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Append `buf`, then rotate if the size limit has been reached.
    ///
    /// Write failures are returned. Rotation failures go to the diagnostic
    /// channel; the bytes are already on disk by then.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let file = self.open_locked(&mut state)?;
        if let Err(e) = file.write_all(buf) {
            // Part of `buf` may have landed; trust the file over the counter.
            if let Ok(meta) = file.metadata() {
                state.size = meta.len();
            }
            return Err(e);
        }
        state.size += buf.len() as u64;

        if self.policy.max_size.is_some_and(|max| state.size >= max) {
            if let Err(e) = self.rotate_locked(&mut state) {
                self.diagnostics.report(&e);
            }
        }
        Ok(buf.len())
    }

    /// Rotate now, whatever the current size.
    pub fn rotate(&self) -> Result<(), LogError> {
        let mut state = self.state.lock();
        self.rotate_locked(&mut state)
    }

    /// Flush and fsync the active file, if one is open.
    pub fn sync(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        match state.file.as_mut() {
            Some(file) => {
                file.flush()?;
                file.sync_all()
            }
            None => Ok(()),
        }
    }

    /// Backups on disk, newest first.
    pub fn backups(&self) -> Vec<Backup> {
        let mut state = self.state.lock();
        match self.scan_backups() {
            Ok(found) => state.backups = found,
            Err(e) => self
                .diagnostics
                .report(&LogError::rotation(&self.path, "listing backups", e)),
        }
        state.backups.clone()
    }

    /// Release the file and wait for queued compression. A later write
    /// reopens the file.
    pub fn close(&self) -> io::Result<()> {
        let result = {
            let mut state = self.state.lock();
            match state.file.take() {
                Some(file) => file.sync_all(),
                None => Ok(()),
            }
        };
        self.compressor.shutdown();
        result
    }

    fn open_locked<'a>(&self, state: &'a mut State) -> io::Result<&'a mut File> {
        if state.file.is_none() {
            let file = (self.fs.open)(&self.path)?;
            state.size = file.metadata()?.len();
            state.backups = self.scan_backups().unwrap_or_default();
            state.file = Some(file);
        }
        state
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file not open"))
    }

    fn rotate_locked(&self, state: &mut State) -> Result<(), LogError> {
        if let Some(file) = state.file.take() {
            if let Err(e) = (self.fs.sync)(&file) {
                self.diagnostics
                    .report(&LogError::rotation(&self.path, "syncing", e));
            }
        }

        let stamp = self.next_stamp(state);
        let backup = self.backup_path(stamp);
        match (self.fs.rename)(&self.path, &backup) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                // Keep appending to the old file; the next write retries.
                if let Ok(file) = (self.fs.open)(&self.path) {
                    state.file = Some(file);
                }
                return Err(LogError::rotation(&self.path, "renaming", e));
            }
        }

        state.size = 0;
        info!(target: "logtee", path = %self.path.display(), backup = %backup.display(), "Rotated log file");
        let reopened = (self.fs.open)(&self.path);
        self.enforce_retention(state);
        state.file = Some(reopened.map_err(|e| LogError::rotation(&self.path, "reopening", e))?);
        Ok(())
    }

    /// Millisecond timestamp later than every earlier one from this writer and
    /// not already used by a file on disk.
    fn next_stamp(&self, state: &mut State) -> DateTime<Utc> {
        let mut stamp = Utc::now().trunc_subsecs(3);
        if let Some(last) = state.last_stamp {
            if stamp <= last {
                stamp = last + Duration::milliseconds(1);
            }
        }
        loop {
            let candidate = self.backup_path(stamp);
            if !candidate.exists() && !gz_path(&candidate).exists() {
                break;
            }
            stamp += Duration::milliseconds(1);
        }
        state.last_stamp = Some(stamp);
        stamp
    }

    fn backup_path(&self, stamp: DateTime<Utc>) -> PathBuf {
        let formatted = if self.policy.local_time {
            stamp.with_timezone(&Local).format(BACKUP_TIME_FORMAT).to_string()
        } else {
            stamp.format(BACKUP_TIME_FORMAT).to_string()
        };
        self.dir()
            .join(format!("{}{}{}", self.prefix, formatted, self.ext))
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn scan_backups(&self) -> io::Result<Vec<Backup>> {
        let mut found: Vec<Backup> = Vec::new();
        let dir = match fs::read_dir(self.dir()) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e),
        };

        for entry in dir {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(backup) = self.parse_backup(&entry.path(), name) else {
                continue;
            };
            // A file mid-compression exists in both forms; keep the plain one.
            match found.iter_mut().find(|b| b.created == backup.created) {
                Some(existing) if existing.compressed && !backup.compressed => *existing = backup,
                Some(_) => {}
                None => found.push(backup),
            }
        }

        found.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(found)
    }

    fn parse_backup(&self, path: &Path, name: &str) -> Option<Backup> {
        let rest = name.strip_prefix(&self.prefix)?;
        let gz_suffix = format!("{}{GZ_EXT}", self.ext);
        let (stamp, compressed) = match rest.strip_suffix(&gz_suffix) {
            Some(stamp) => (stamp, true),
            None => (rest.strip_suffix(self.ext.as_str())?, false),
        };
        let naive = NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT).ok()?;
        let created = if self.policy.local_time {
            Local
                .from_local_datetime(&naive)
                .earliest()?
                .with_timezone(&Utc)
        } else {
            naive.and_utc()
        };
        Some(Backup {
            path: path.to_path_buf(),
            created,
            compressed,
        })
    }

    fn enforce_retention(&self, state: &mut State) {
        let backups = match self.scan_backups() {
            Ok(b) => b,
            Err(e) => {
                self.diagnostics
                    .report(&LogError::rotation(&self.path, "listing backups", e));
                return;
            }
        };

        let cutoff = self.policy.max_age.map(|age| Utc::now() - age);
        let mut kept = Vec::with_capacity(backups.len());
        for (i, backup) in backups.into_iter().enumerate() {
            let over_count = self.policy.max_backups > 0 && i >= self.policy.max_backups;
            let too_old = cutoff.is_some_and(|c| backup.created < c);
            if over_count || too_old {
                self.remove_backup(&backup);
                continue;
            }
            if self.policy.compress && !backup.compressed {
                self.compressor.submit(backup.path.clone());
            }
            kept.push(backup);
        }
        state.backups = kept;
    }

    fn remove_backup(&self, backup: &Backup) {
        let plain = if backup.compressed {
            backup.path.with_extension("")
        } else {
            backup.path.clone()
        };
        for path in [gz_path(&plain), plain] {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(target: "logtee", path = %path.display(), "Removed expired backup");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => self
                    .diagnostics
                    .report(&LogError::rotation(&path, "removing backup", e)),
            }
        }
    }
}

impl Sink for RotatingFile {
    fn name(&self) -> &'static str {
        "file"
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.write(buf).map(|_| ())
    }

    fn sync(&self) -> io::Result<()> {
        RotatingFile::sync(self)
    }
}

impl std::fmt::Debug for RotatingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFile")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> Diagnostics {
        Diagnostics::to_writer(io::sink())
    }

    fn sized(bytes: u64) -> RotationPolicy {
        RotationPolicy {
            max_size: Some(bytes),
            ..RotationPolicy::default()
        }
    }

    #[test]
    fn policy_from_options_converts_units() {
        let opts = Options {
            max_size: 2,
            max_backups: 3,
            max_age: 7,
            ..Options::default()
        };
        let policy = RotationPolicy::from_options(&opts);
        assert_eq!(policy.max_size, Some(2 * 1024 * 1024));
        assert_eq!(policy.max_backups, 3);
        assert_eq!(policy.max_age, Some(Duration::days(7)));
    }

    #[test]
    fn zero_settings_mean_unlimited() {
        let policy = RotationPolicy::from_options(&Options::default());
        assert_eq!(policy.max_size, None);
        assert_eq!(policy.max_backups, 0);
        assert_eq!(policy.max_age, None);
    }

    #[test]
    fn adopts_existing_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "0123456789").unwrap();

        let file = RotatingFile::new(&path, sized(1024), quiet());
        file.write(b"abc").unwrap();
        assert_eq!(file.size(), 13);
        assert_eq!(fs::read_to_string(&path).unwrap(), "0123456789abc");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/app.log");
        let file = RotatingFile::new(&path, RotationPolicy::default(), quiet());
        file.write(b"x\n").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn never_rotates_without_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let file = RotatingFile::new(&path, RotationPolicy::default(), quiet());
        for _ in 0..100 {
            file.write(&[b'x'; 100]).unwrap();
        }
        assert_eq!(file.size(), 10_000);
        assert!(file.backups().is_empty());
    }

    #[test]
    fn rotates_after_the_crossing_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let file = RotatingFile::new(&path, sized(10), quiet());

        file.write(b"12345").unwrap();
        assert!(file.backups().is_empty());
        file.write(b"678901").unwrap();

        let backups = file.backups();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), "12345678901");
        assert_eq!(file.size(), 0);

        file.write(b"after").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "after");
    }

    #[test]
    fn backup_names_are_unique_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let file = RotatingFile::new(&path, sized(1), quiet());
        for i in 0..5 {
            file.write(format!("{i}").as_bytes()).unwrap();
        }

        let backups = file.backups();
        assert_eq!(backups.len(), 5);
        for pair in backups.windows(2) {
            assert!(pair[0].created > pair[1].created);
        }
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), "4");
        let name = backups[0].path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("app-") && name.ends_with(".log"), "{name}");
    }

    #[test]
    fn forced_rotation_without_file_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let file = RotatingFile::new(dir.path().join("app.log"), sized(10), quiet());
        file.rotate().unwrap();
        assert!(file.backups().is_empty());
    }

    #[test]
    fn ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app-notadate.log"), "").unwrap();
        fs::write(dir.path().join("other-2020-01-01T00-00-00.000.log"), "").unwrap();
        fs::write(dir.path().join("app-2020-01-01T00-00-00.000.txt"), "").unwrap();

        let file = RotatingFile::new(dir.path().join("app.log"), sized(10), quiet());
        assert!(file.backups().is_empty());
    }

    #[test]
    fn parses_compressed_backups() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app-2020-01-01T00-00-00.000.log.gz"), "").unwrap();

        let file = RotatingFile::new(dir.path().join("app.log"), sized(10), quiet());
        let backups = file.backups();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].compressed);
        assert_eq!(
            backups[0].created,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );
    }

    fn diagnostics() -> (Diagnostics, crate::sink::MemorySink) {
        let mem = crate::sink::MemorySink::new();
        (Diagnostics::to_writer(mem.clone()), mem)
    }

    fn refuse_rename(_: &Path, _: &Path) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }

    #[test]
    fn failed_rename_keeps_appending_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let (diag, mem) = diagnostics();
        let file = RotatingFile::new(&path, sized(4), diag).with_fs(FsOps {
            rename: refuse_rename,
            ..FsOps::default()
        });

        assert_eq!(file.write(b"abcd").unwrap(), 4);
        assert_eq!(file.write(b"ef").unwrap(), 2);

        assert_eq!(fs::read_to_string(&path).unwrap(), "abcdef");
        assert_eq!(file.size(), 6);
        assert!(file.backups().is_empty());
        let lines = mem.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.contains("rotation error") && l.contains("renaming")));
    }

    thread_local! {
        static FAIL_OPEN: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
    }

    fn flaky_open(path: &Path) -> io::Result<File> {
        if FAIL_OPEN.with(|f| f.get()) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        open_append(path)
    }

    #[test]
    fn failed_reopen_still_applies_retention() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let (diag, mem) = diagnostics();
        let policy = RotationPolicy {
            max_backups: 1,
            ..sized(2)
        };
        let file = RotatingFile::new(&path, policy, diag).with_fs(FsOps {
            open: flaky_open,
            ..FsOps::default()
        });

        file.write(b"a1").unwrap();
        file.write(b"b2").unwrap();
        file.write(b"c").unwrap();
        FAIL_OPEN.with(|f| f.set(true));
        assert_eq!(file.write(b"3").unwrap(), 1);
        FAIL_OPEN.with(|f| f.set(false));

        let backups = file.backups();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), "c3");
        assert!(mem.contents().contains("reopening"));

        file.write(b"d").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "d");
    }

    #[test]
    fn failed_sync_before_rotation_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (diag, mem) = diagnostics();
        let file = RotatingFile::new(dir.path().join("app.log"), sized(2), diag).with_fs(FsOps {
            sync: |_| Err(io::Error::other("disk gone")),
            ..FsOps::default()
        });

        assert!(file.write(b"ab").is_ok());
        assert_eq!(file.backups().len(), 1);
        let lines = mem.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("syncing") && lines[0].contains("disk gone"));
    }

    #[test]
    fn failed_write_resyncs_size_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "0123456789").unwrap();
        let file = RotatingFile::new(&path, sized(1024), quiet()).with_fs(FsOps {
            open: |p| File::open(p),
            ..FsOps::default()
        });

        assert!(file.write(b"lost").is_err());
        assert_eq!(file.size(), 10);

        OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"abcde")
            .unwrap();
        assert!(file.write(b"lost").is_err());
        assert_eq!(file.size(), 15);
    }

    #[test]
    fn file_without_extension_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server");
        let file = RotatingFile::new(&path, sized(2), quiet());
        file.write(b"ab").unwrap();
        let backups = file.backups();
        assert_eq!(backups.len(), 1);
        assert!(
            backups[0]
                .path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("server-")
        );
    }
}
