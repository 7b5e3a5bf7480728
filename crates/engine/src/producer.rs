// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Producers: capture turns into the WAL
//!
//! Capture is best effort. A capture that cannot take the WAL lock within
//! the retry budget is dropped and reported, never retried in-process.

use crate::launch::WorkerLauncher;
use crate::transcript::{self, Turn};
use crate::{EngineError, Relay};
use std::path::Path;
use trl_core::{ChannelId, Clock, ContentHash, Speaker};
use trl_storage::HandoffMarker;

/// Result of capturing one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Appended(u64),
    /// Identical normalized content is already in the WAL
    Duplicate,
    /// Blank content is never stored
    Empty,
    /// The append failed; the turn was not stored
    Dropped(String),
}

impl CaptureOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, CaptureOutcome::Appended(_))
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, CaptureOutcome::Dropped(_))
    }
}

/// Captures turns and starts a worker once something new is stored
pub struct Producer<'r, C: Clock, L> {
    relay: &'r Relay<C>,
    launcher: L,
}

impl<'r, C: Clock, L: WorkerLauncher> Producer<'r, C, L> {
    pub fn new(relay: &'r Relay<C>, launcher: L) -> Self {
        Self { relay, launcher }
    }

    /// Capture a submission from the local party
    pub fn capture_local(&self, content: &str, channel: ChannelId) -> CaptureOutcome {
        let outcome = self.capture(Speaker::Local, content, channel);
        if outcome.is_appended() {
            self.launch();
        }
        outcome
    }

    /// Capture counterpart turns written to `transcript` since the last call
    ///
    /// The watermark lock is held across read, append, and advance so two
    /// concurrent calls never extract the same turn. The watermark stops at
    /// the first dropped turn so it is retried next time.
    pub fn capture_counterpart(
        &self,
        transcript: &Path,
        channel: ChannelId,
    ) -> Result<Vec<CaptureOutcome>, EngineError> {
        let mut watermarks = self.relay.watermarks().lock()?;
        let offset = watermarks.value.get(transcript);
        let chunk = read_transcript(transcript, offset)?;

        let counterpart: Vec<&Turn> = chunk
            .turns
            .iter()
            .filter(|turn| turn.speaker == Speaker::Counterpart)
            .collect();
        let (outcomes, stopped_at) = self.capture_turns(&counterpart, channel, offset);

        watermarks
            .value
            .set(transcript, stopped_at.unwrap_or(chunk.end));
        watermarks.save()?;
        drop(watermarks);

        tracing::debug!(
            transcript = %transcript.display(),
            from = offset,
            to = chunk.end,
            turns = outcomes.len(),
            "captured counterpart turns"
        );
        if outcomes.iter().any(CaptureOutcome::is_appended) {
            self.launch();
        }
        Ok(outcomes)
    }

    /// Replay a transcript left behind by the previous session
    ///
    /// Both speakers are replayed from where the last recovery of this
    /// transcript stopped, from its start the first time. Turns whose hash is
    /// already stored are skipped. The marker is deleted once the transcript
    /// is fully replayed.
    pub fn recover(&self) -> Result<Vec<CaptureOutcome>, EngineError> {
        let handoff = self.relay.handoff();
        let Some(marker) = handoff.load()? else {
            return Ok(Vec::new());
        };

        let len = match std::fs::metadata(&marker.transcript) {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(
                    transcript = %marker.transcript.display(),
                    error = %e,
                    "hand-off transcript unreadable, discarding marker"
                );
                handoff.clear()?;
                return Ok(Vec::new());
            }
        };

        let mut watermarks = self.relay.watermarks().lock()?;
        let offset = watermarks.value.replayed(&marker.transcript);
        if offset >= len {
            drop(watermarks);
            handoff.clear()?;
            return Ok(Vec::new());
        }

        let chunk = read_transcript(&marker.transcript, offset)?;
        let turns: Vec<&Turn> = chunk.turns.iter().collect();
        let (outcomes, stopped_at) = self.capture_turns(&turns, marker.channel, offset);

        let reached = stopped_at.unwrap_or(chunk.end);
        let captured = watermarks.value.get(&marker.transcript);
        watermarks.value.set_replayed(&marker.transcript, reached);
        watermarks.value.set(&marker.transcript, captured.max(reached));
        watermarks.save()?;
        drop(watermarks);

        if stopped_at.is_none() {
            handoff.clear()?;
        }
        tracing::info!(
            transcript = %marker.transcript.display(),
            replayed = outcomes.iter().filter(|o| o.is_appended()).count(),
            "recovered hand-off transcript"
        );
        if outcomes.iter().any(CaptureOutcome::is_appended) {
            self.launch();
        }
        Ok(outcomes)
    }

    /// Leave a marker so the next session replays anything this one missed
    pub fn write_handoff(&self, transcript: &Path, channel: ChannelId) -> Result<(), EngineError> {
        let marker = HandoffMarker {
            transcript: transcript.to_path_buf(),
            channel,
            written_at: self.relay.clock().now(),
        };
        self.relay.handoff().update(|slot| *slot = Some(marker))?;
        Ok(())
    }

    /// Capture turns in order, returning where to leave the watermark if one was dropped
    fn capture_turns(
        &self,
        turns: &[&Turn],
        channel: ChannelId,
        start: u64,
    ) -> (Vec<CaptureOutcome>, Option<u64>) {
        let mut outcomes = Vec::with_capacity(turns.len());
        let mut resume = start;
        for turn in turns {
            let outcome = self.capture(turn.speaker, &turn.text, channel);
            if outcome.is_dropped() {
                outcomes.push(outcome);
                return (outcomes, Some(resume));
            }
            resume = turn.end;
            outcomes.push(outcome);
        }
        (outcomes, None)
    }

    fn capture(&self, speaker: Speaker, content: &str, channel: ChannelId) -> CaptureOutcome {
        if content.trim().is_empty() {
            return CaptureOutcome::Empty;
        }

        let hash = ContentHash::of(content);
        let store = &self.relay.store;
        match store.contains_hash(&hash) {
            Ok(true) => {
                tracing::debug!(%speaker, %hash, "duplicate content, skipping");
                return CaptureOutcome::Duplicate;
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "dedup check failed, appending anyway"),
        }

        match store.append(speaker, channel, content, Some(hash)) {
            Ok(seq) => CaptureOutcome::Appended(seq),
            Err(e) => {
                tracing::warn!(%speaker, error = %e, "dropping capture");
                CaptureOutcome::Dropped(e.to_string())
            }
        }
    }

    fn launch(&self) {
        if !self.relay.config.worker.autostart {
            return;
        }
        if let Err(e) = self.launcher.launch() {
            tracing::warn!(error = %e, "worker launch failed");
        }
    }
}

fn read_transcript(path: &Path, offset: u64) -> Result<transcript::TranscriptChunk, EngineError> {
    transcript::read_from(path, offset).map_err(|source| EngineError::Transcript {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "producer_tests.rs"]
mod tests;
