//! Per-category advisory lock.
//!
//! Loads hold the lock shared and replacing a category's files holds it
//! exclusively. The lock lives on an open handle to `<category>.lock`, so the
//! operating system releases it when the handle closes, including when the
//! holding process dies. The file itself is left in place.

use super::Category;
use crate::error::{Result, TldwError};
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Shared,
    Exclusive,
}

/// Held lock on one category's corpus files.
#[derive(Debug)]
pub struct CategoryLock {
    file: File,
    path: PathBuf,
}

impl CategoryLock {
    /// Acquire the lock alongside other readers, waiting up to `timeout`
    /// for a writer to finish.
    pub fn shared(dir: &Path, category: Category, timeout: Duration) -> Result<Self> {
        Self::acquire(dir, category, timeout, Mode::Shared)
    }

    /// Acquire the lock for writing, waiting up to `timeout` for every other
    /// holder to release it.
    pub fn exclusive(dir: &Path, category: Category, timeout: Duration) -> Result<Self> {
        Self::acquire(dir, category, timeout, Mode::Exclusive)
    }

    fn acquire(dir: &Path, category: Category, timeout: Duration, mode: Mode) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.lock", category));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let deadline = Instant::now() + timeout;

        loop {
            let attempt = match mode {
                Mode::Shared => file.try_lock_shared(),
                Mode::Exclusive => file.try_lock(),
            };

            match attempt {
                Ok(()) => {
                    debug!("Acquired {:?} lock {:?}", mode, path);
                    return Ok(Self { file, path });
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(TldwError::CorpusLocked(category.to_string()));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(TryLockError::Error(e)) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CategoryLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("Failed to release lock {:?}: {}", self.path, e);
        }
    }
}
