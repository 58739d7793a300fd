//! Named mutual-exclusion lock shared across processes.
//!
//! Locks are scoped by name so distinct operations never contend with each
//! other, while two invocations of the same operation do. Acquisition is
//! non-blocking: a second holder fails immediately instead of queueing.
//!
//! The guard releases on `Drop`, which covers every exit path from the locked
//! region, including error returns.

use crate::error::Error;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct NamedLock {
    name: String,
    path: PathBuf,
    // Held for the lifetime of the guard; the flock is tied to this handle.
    #[allow(dead_code)]
    file: File,
}

impl NamedLock {
    /// Try to acquire the lock `<dir>/<name>.lock`.
    ///
    /// Returns [`Error::LockContention`] when another process holds it.
    pub fn acquire(dir: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create lock directory {:?}", dir))?;
        let path = dir.join(format!("{}.lock", name));

        let file = Self::try_lock(&path, name)?;
        debug!(%name, ?path, "acquired lock");
        Ok(Self {
            name: name.to_string(),
            path,
            file,
        })
    }

    #[cfg(unix)]
    fn try_lock(path: &Path, name: &str) -> Result<File> {
        use std::os::unix::io::AsRawFd;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file {:?}", path))?;

        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            return Err(Error::LockContention(name.to_string()).into());
        }
        Ok(file)
    }

    #[cfg(not(unix))]
    fn try_lock(path: &Path, name: &str) -> Result<File> {
        // No flock available; fall back to exclusive creation. A crashed
        // holder leaves a stale file behind, unlike the unix path.
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(Error::LockContention(name.to_string()).into())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to create lock file {:?}", path)),
        }
    }
}

impl Drop for NamedLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
        }
        #[cfg(not(unix))]
        {
            let _ = std::fs::remove_file(&self.path);
        }
        debug!(name = %self.name, path = ?self.path, "released lock");
    }
}
