// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `trl status` and `trl compact`

use crate::output::{print, OutputFormat};
use clap::Args;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use trl_core::SinkKind;
use trl_engine::Relay;
use trl_storage::{RunLock, Sequencer};

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CompactArgs {
    /// Override the configured retention (e.g. "3d", "12h")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub retention: Option<Duration>,
    #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    state_dir: String,
    sink: &'static str,
    channel: u64,
    entries: usize,
    unposted: usize,
    malformed: usize,
    last_seq: Option<u64>,
    next_seq: u64,
    worker_pid: Option<u32>,
    verified_through: u64,
    handoff: Option<String>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State:     {}", self.state_dir)?;
        writeln!(f, "Sink:      {} (channel {})", self.sink, self.channel)?;
        writeln!(
            f,
            "Entries:   {} ({} unposted, {} malformed)",
            self.entries, self.unposted, self.malformed
        )?;
        match self.last_seq {
            Some(seq) => writeln!(f, "Last seq:  {} (next {})", seq, self.next_seq)?,
            None => writeln!(f, "Last seq:  - (next {})", self.next_seq)?,
        }
        match self.worker_pid {
            Some(pid) => writeln!(f, "Worker:    running (pid {})", pid)?,
            None => writeln!(f, "Worker:    idle")?,
        }
        writeln!(f, "Verified:  through seq {}", self.verified_through)?;
        write!(f, "Hand-off:  {}", self.handoff.as_deref().unwrap_or("-"))
    }
}

pub fn status(relay: &Relay, args: StatusArgs) -> anyhow::Result<()> {
    let scan = relay.store.scan()?;
    let sequencer = Sequencer::new(&relay.paths, relay.lock_policy());

    let report = StatusReport {
        state_dir: relay.paths.root().display().to_string(),
        sink: match relay.config.sink.kind {
            SinkKind::Github => "github",
            SinkKind::Disabled => "disabled",
        },
        channel: relay.config.channel.0,
        entries: scan.entries.len(),
        unposted: scan.entries.iter().filter(|e| !e.posted).count(),
        malformed: scan.malformed,
        last_seq: scan.entries.iter().map(|e| e.seq).max(),
        next_seq: sequencer.peek(),
        worker_pid: RunLock::holder(&relay.paths.run_lock()),
        verified_through: relay.checkpoint().load()?.last_seq,
        handoff: relay
            .handoff()
            .load()?
            .map(|marker| marker.transcript.display().to_string()),
    };
    print(&report, args.format);
    Ok(())
}

#[derive(Debug, Serialize)]
struct CompactSummary {
    kept: usize,
    removed: usize,
}

impl fmt::Display for CompactSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Removed {} entries, kept {}", self.removed, self.kept)
    }
}

pub fn compact(relay: &Relay, args: CompactArgs) -> anyhow::Result<()> {
    let retention = args.retention.unwrap_or(relay.config.worker.retention);
    let report = relay.store.compact(retention)?;
    tracing::info!(kept = report.kept, removed = report.removed, "compacted");
    print(
        &CompactSummary {
            kept: report.kept,
            removed: report.removed,
        },
        args.format,
    );
    Ok(())
}
