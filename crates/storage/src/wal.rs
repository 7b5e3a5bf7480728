// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log of captured turns
//!
//! One JSON record per line, appended under the WAL lock. Entries are only
//! ever changed by rewriting the whole log to a temp file and renaming it
//! over the original, so a crash at any point leaves either the old or the
//! new log, never a mix.

use crate::atomic;
use crate::lock::{FileLock, LockPolicy};
use crate::sequencer::Sequencer;
use crate::StorageError;
use chrono::TimeDelta;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use trl_core::{ChannelId, Clock, ContentHash, Speaker, StatePaths, SystemClock, WalEntry};

/// Result of reading the whole log
#[derive(Debug, Default)]
pub struct WalScan {
    /// Valid entries in file order
    pub entries: Vec<WalEntry>,
    /// Lines that failed to parse (skipped, but preserved on rewrite)
    pub malformed: usize,
}

/// Result of a compaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactReport {
    pub kept: usize,
    pub removed: usize,
}

/// A raw log line and its parsed entry, if it parsed
struct Record {
    raw: Vec<u8>,
    entry: Option<WalEntry>,
    dirty: bool,
}

impl Record {
    fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        match (&self.entry, self.dirty) {
            (Some(entry), true) => Ok(entry.to_line()?.into_bytes()),
            _ => Ok(self.raw.clone()),
        }
    }
}

/// Durable store of [`WalEntry`] records
#[derive(Clone)]
pub struct WalStore<C: Clock = SystemClock> {
    path: PathBuf,
    lock_path: PathBuf,
    policy: LockPolicy,
    sequencer: Sequencer<C>,
    clock: C,
}

impl WalStore<SystemClock> {
    pub fn open(paths: &StatePaths, policy: LockPolicy) -> Self {
        Self::with_clock(paths, policy, SystemClock)
    }
}

impl<C: Clock> WalStore<C> {
    pub fn with_clock(paths: &StatePaths, policy: LockPolicy, clock: C) -> Self {
        Self {
            path: paths.wal(),
            lock_path: paths.wal_lock(),
            policy,
            sequencer: Sequencer::with_clock(paths, policy, clock.clone()),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new unposted entry and return its sequence number
    ///
    /// The record is synced to disk before this returns. Fails with a lock
    /// error after the retry budget instead of blocking; callers capturing
    /// best-effort treat that as "drop this capture".
    pub fn append(
        &self,
        speaker: Speaker,
        channel: ChannelId,
        content: &str,
        hash: Option<ContentHash>,
    ) -> Result<u64, StorageError> {
        let _guard = FileLock::acquire(&self.lock_path, self.policy)?;

        let floor = self.scan()?.entries.iter().map(|e| e.seq).max().map_or(1, |s| s + 1);
        let seq = self.sequencer.allocate(floor)?;
        let hash = hash.unwrap_or_else(|| ContentHash::of(content));
        let entry = WalEntry::with_hash(seq, self.clock.now(), speaker, channel, content, hash);

        let mut line = entry.to_line()?.into_bytes();
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        if ends_with_partial_line(&mut file)? {
            // A torn append left no newline; terminate it so this record parses
            line.insert(0, b'\n');
        }
        file.write_all(&line)?;
        file.flush()?;
        file.sync_all()?;

        tracing::debug!(seq, %speaker, channel = %channel, hash = %entry.hash, "appended entry");
        Ok(seq)
    }

    /// Read every valid entry, counting malformed lines
    pub fn scan(&self) -> Result<WalScan, StorageError> {
        let mut scan = WalScan::default();
        for record in self.load_records()? {
            match record.entry {
                Some(entry) => scan.entries.push(entry),
                None => scan.malformed += 1,
            }
        }
        Ok(scan)
    }

    /// All entries in file order
    pub fn read_all(&self) -> Result<Vec<WalEntry>, StorageError> {
        Ok(self.scan()?.entries)
    }

    /// Unposted entries in ascending sequence order
    pub fn read_unposted(&self) -> Result<Vec<WalEntry>, StorageError> {
        let mut entries: Vec<_> = self
            .read_all()?
            .into_iter()
            .filter(|e| !e.posted)
            .collect();
        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }

    /// Look up one entry by sequence number
    pub fn get(&self, seq: u64) -> Result<Option<WalEntry>, StorageError> {
        Ok(self.read_all()?.into_iter().find(|e| e.seq == seq))
    }

    /// Hashes of every stored entry
    ///
    /// Read without the write lock: a concurrent append may be missed, which
    /// costs at most one duplicate line.
    pub fn hashes(&self) -> Result<HashSet<ContentHash>, StorageError> {
        Ok(self.read_all()?.into_iter().map(|e| e.hash).collect())
    }

    pub fn contains_hash(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        Ok(self.read_all()?.iter().any(|e| &e.hash == hash))
    }

    pub fn last_seq(&self) -> Result<Option<u64>, StorageError> {
        Ok(self.read_all()?.iter().map(|e| e.seq).max())
    }

    /// Mark an entry delivered; returns false when no entry has `seq`
    ///
    /// An entry that is already posted keeps its first reference.
    pub fn mark_posted(&self, seq: u64, external_ref: &str) -> Result<bool, StorageError> {
        if external_ref.trim().is_empty() {
            return Err(StorageError::EmptyExternalRef { seq });
        }

        let _guard = FileLock::acquire(&self.lock_path, self.policy)?;
        let mut records = self.load_records()?;

        let Some(record) = records
            .iter_mut()
            .find(|r| r.entry.as_ref().is_some_and(|e| e.seq == seq))
        else {
            return Ok(false);
        };
        let Some(entry) = record.entry.as_mut() else {
            return Ok(false);
        };

        if entry.posted {
            if entry.external_ref.as_deref() != Some(external_ref) {
                tracing::warn!(
                    seq,
                    existing = ?entry.external_ref,
                    new = external_ref,
                    "entry already posted, keeping first reference"
                );
            }
            return Ok(true);
        }

        entry.mark_posted(external_ref);
        record.dirty = true;
        self.commit(&records)?;

        tracing::debug!(seq, external_ref, "marked posted");
        Ok(true)
    }

    /// Drop posted entries older than `retention`; unposted entries always stay
    pub fn compact(&self, retention: Duration) -> Result<CompactReport, StorageError> {
        let _guard = FileLock::acquire(&self.lock_path, self.policy)?;
        let records = self.load_records()?;

        let retention = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
        let now = self.clock.now();
        let cutoff = now.checked_sub_signed(retention);

        let total = records.len();
        let kept: Vec<Record> = records
            .into_iter()
            .filter(|r| match (&r.entry, cutoff) {
                (Some(entry), Some(cutoff)) => !(entry.posted && entry.ts < cutoff),
                _ => true,
            })
            .collect();

        let report = CompactReport {
            kept: kept.len(),
            removed: total - kept.len(),
        };
        if report.removed > 0 {
            self.commit(&kept)?;
            tracing::info!(kept = report.kept, removed = report.removed, "compacted WAL");
        }
        Ok(report)
    }

    fn load_records(&self) -> Result<Vec<Record>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (index, raw) in bytes.split(|b| *b == b'\n').enumerate() {
            if raw.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let entry = std::str::from_utf8(raw)
                .ok()
                .and_then(|line| match WalEntry::from_line(line) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!(line = index + 1, error = %e, "skipping malformed WAL record");
                        None
                    }
                });
            records.push(Record {
                raw: raw.to_vec(),
                entry,
                dirty: false,
            });
        }
        Ok(records)
    }

    fn write_temp(&self, records: &[Record]) -> Result<PathBuf, StorageError> {
        let mut bytes = Vec::new();
        for record in records {
            bytes.extend(record.to_bytes()?);
            bytes.push(b'\n');
        }
        Ok(atomic::write_temp(&self.path, &bytes)?)
    }

    fn commit(&self, records: &[Record]) -> Result<(), StorageError> {
        let tmp = self.write_temp(records)?;
        atomic::replace(&tmp, &self.path)?;
        Ok(())
    }
}

fn ends_with_partial_line(file: &mut std::fs::File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
