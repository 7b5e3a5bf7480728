// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive advisory file locks with bounded acquisition
//!
//! Every mutation of shared state happens under one of these locks. Locks are
//! taken on dedicated `.lock` files rather than on the data files, because
//! data files are replaced by rename and a lock on a replaced inode guards
//! nothing.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use trl_core::LocksConfig;

/// Lock acquisition errors
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock {} busy after {attempts} attempts", path.display())]
    Busy { path: PathBuf, attempts: u32 },
    #[error("IO error on lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How hard to try for a lock before giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl LockPolicy {
    /// Single attempt, no waiting
    pub const NON_BLOCKING: LockPolicy = LockPolicy {
        attempts: 1,
        interval: Duration::ZERO,
    };

    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    pub fn from_config(config: &LocksConfig) -> Self {
        Self::new(config.attempts, config.interval)
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::from_config(&LocksConfig::default())
    }
}

/// Exclusive lock held until the guard is dropped
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock on `path`, retrying per `policy`
    pub fn acquire(path: &Path, policy: LockPolicy) -> Result<Self, LockError> {
        let io_err = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;

        let attempts = policy.attempts.max(1);
        for attempt in 1..=attempts {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    })
                }
                Err(e) if is_contended(&e) => {
                    if attempt < attempts {
                        std::thread::sleep(policy.interval);
                    }
                }
                Err(e) => return Err(io_err(e)),
            }
        }

        tracing::debug!(path = %path.display(), attempts, "lock busy");
        Err(LockError::Busy {
            path: path.to_path_buf(),
            attempts,
        })
    }

    /// Single non-blocking attempt
    pub fn try_acquire(path: &Path) -> Result<Self, LockError> {
        Self::acquire(path, LockPolicy::NON_BLOCKING)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to unlock");
        }
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Marker that a worker is draining the queue, recording the holder's PID
///
/// Absence of a holder only means nobody holds the lock right now.
#[derive(Debug)]
pub struct RunLock {
    lock: FileLock,
}

impl RunLock {
    /// Try to become the draining worker; `Ok(None)` when another process holds the lock
    pub fn try_acquire(path: &Path, policy: LockPolicy) -> Result<Option<Self>, LockError> {
        let lock = match FileLock::acquire(path, policy) {
            Ok(lock) => lock,
            Err(LockError::Busy { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let record_pid = |file: &File| -> io::Result<()> {
            let mut file = file;
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            writeln!(file, "{}", std::process::id())?;
            file.sync_all()
        };
        if let Err(e) = record_pid(&lock.file) {
            tracing::warn!(error = %e, "failed to record worker pid");
        }

        Ok(Some(Self { lock }))
    }

    /// PID recorded by the current holder, if the lock is held
    pub fn holder(path: &Path) -> Option<u32> {
        match FileLock::try_acquire(path) {
            Ok(_probe) => None,
            Err(LockError::Busy { .. }) => {
                let mut text = String::new();
                File::open(path).ok()?.read_to_string(&mut text).ok()?;
                text.trim().parse().ok()
            }
            Err(_) => None,
        }
    }

    pub fn path(&self) -> &Path {
        self.lock.path()
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // Clear the PID before the inner guard unlocks
        let _ = self.lock.file.set_len(0);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
