//! File locking and atomic writes for the task file
//!
//! Every writer of `tasks.json` takes an exclusive `fs2` lock on the sibling
//! `tasks.json.lock`, then replaces the data file by writing a temp file in
//! the same directory and renaming it over the target.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const RETRY_EVERY: Duration = Duration::from_millis(50);

/// Path of the lock file guarding `path`
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Exclusive advisory lock on a lock file, released on drop
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Lock the file guarding the data file at `data_path`.
    pub fn guard(data_path: &Path, timeout_ms: u64) -> Result<Self> {
        Self::acquire(lock_path_for(data_path), timeout_ms)
    }

    /// Lock `path` itself, polling until `timeout_ms` has passed.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let file = open_lock_file(path)?;

        while !try_lock(&file)? {
            if Instant::now() >= deadline {
                tracing::warn!(path = %path.display(), timeout_ms, "task file lock timed out");
                return Err(Error::LockFailed(path.to_path_buf()));
            }
            std::thread::sleep(RETRY_EVERY);
        }
        tracing::trace!(path = %path.display(), "task file locked");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Single attempt; `Ok(None)` when someone else holds the lock.
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;
        if !try_lock(&file)? {
            return Ok(None);
        }
        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(file)
}

/// `Ok(false)` when the lock is held elsewhere.
fn try_lock(file: &File) -> Result<bool> {
    match file.try_lock_exclusive() {
        Ok(()) => Ok(true),
        Err(err) if contended(&err) => Ok(false),
        Err(err) => Err(Error::Io(err)),
    }
}

fn contended(err: &io::Error) -> bool {
    // Windows reports a sharing or lock violation instead of WouldBlock
    err.kind() == io::ErrorKind::WouldBlock
        || (cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33)))
}

/// Replace `path` with `data`: write `.<name>.<pid>.tmp` next to it, fsync,
/// then rename over the target.
///
/// Does not lock; hold a [`FileLock`] when other processes may write too.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tasks".to_string());
    let temp_path = dir.join(format!(".{name}.{}.tmp", std::process::id()));

    let mut temp = File::create(&temp_path)?;
    temp.write_all(data)?;
    temp.sync_all()?;
    drop(temp);

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }
    Ok(())
}
