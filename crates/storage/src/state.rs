// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small JSON state files shared between processes
//!
//! Each file is guarded by a sibling `.lock` file and replaced atomically on
//! save. A missing file reads as the type's default; a corrupt one is logged
//! and also read as the default.

use crate::atomic::write_atomic;
use crate::lock::{FileLock, LockPolicy};
use crate::StorageError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use trl_core::ChannelId;

/// Per-transcript byte offsets up to which turns have been captured
///
/// Counterpart capture and hand-off recovery keep separate offsets: the
/// former skips local turns, so only the latter says both speakers are in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermarks {
    #[serde(default)]
    transcripts: BTreeMap<String, u64>,
    #[serde(default)]
    replayed: BTreeMap<String, u64>,
}

impl Watermarks {
    /// Offset up to which counterpart turns were captured
    pub fn get(&self, transcript: &Path) -> u64 {
        self.transcripts
            .get(&key(transcript))
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&mut self, transcript: &Path, offset: u64) {
        self.transcripts.insert(key(transcript), offset);
    }

    /// Offset up to which recovery replayed turns of both speakers
    pub fn replayed(&self, transcript: &Path) -> u64 {
        self.replayed.get(&key(transcript)).copied().unwrap_or(0)
    }

    pub fn set_replayed(&mut self, transcript: &Path, offset: u64) {
        self.replayed.insert(key(transcript), offset);
    }
}

fn key(transcript: &Path) -> String {
    transcript.to_string_lossy().into_owned()
}

/// Left behind when a session ends, naming the transcript to drain on the next start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffMarker {
    pub transcript: PathBuf,
    pub channel: ChannelId,
    pub written_at: DateTime<Utc>,
}

/// Remembered fallback channels, keyed by marker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    #[serde(default)]
    fallback: BTreeMap<String, ChannelId>,
}

impl ChannelMap {
    pub fn get(&self, marker: &str) -> Option<ChannelId> {
        self.fallback.get(marker).copied()
    }

    pub fn remember(&mut self, marker: &str, channel: ChannelId) {
        self.fallback.insert(marker.to_string(), channel);
    }
}

/// Highest sequence number the verifier has confirmed delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyCheckpoint {
    pub last_seq: u64,
}

/// Typed handle to one JSON state file
#[derive(Debug, Clone)]
pub struct StateFile<T> {
    path: PathBuf,
    lock_path: PathBuf,
    policy: LockPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StateFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>, policy: LockPolicy) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lock_path = path.with_file_name(format!("{}.lock", name));
        Self {
            path,
            lock_path,
            policy,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read without locking
    pub fn load(&self) -> Result<T, StorageError> {
        read_or_default(&self.path)
    }

    /// Lock, read, mutate, and save in one step
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StorageError> {
        let mut guard = self.lock()?;
        let result = f(&mut guard.value);
        guard.save()?;
        Ok(result)
    }

    /// Hold the lock across a longer read-modify-write
    pub fn lock(&self) -> Result<StateGuard<T>, StorageError> {
        let lock = FileLock::acquire(&self.lock_path, self.policy)?;
        let value = read_or_default(&self.path)?;
        Ok(StateGuard {
            value,
            path: self.path.clone(),
            _lock: lock,
        })
    }

    /// Remove the file; missing is fine
    pub fn clear(&self) -> Result<(), StorageError> {
        let _lock = FileLock::acquire(&self.lock_path, self.policy)?;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Locked view of a state file; the lock is released on drop
pub struct StateGuard<T> {
    pub value: T,
    path: PathBuf,
    _lock: FileLock,
}

impl<T: Serialize> StateGuard<T> {
    pub fn save(&self) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(&self.value)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt state file, using default");
            Ok(T::default())
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
