// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker: drains unposted entries to the sink in sequence order

use crate::delivery::{Delivered, Delivery};
use crate::{EngineError, Relay};
use std::collections::HashSet;
use trl_adapters::Sink;
use trl_core::{Clock, WalEntry};
use trl_storage::{LockPolicy, RunLock};

/// Outcome of one worker run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    /// Entries found already present remotely and marked without posting
    pub deduplicated: usize,
    /// Sequence numbers that exhausted their attempts and stay unposted
    pub failed: Vec<u64>,
    /// Another worker held the run lock, so nothing was done
    pub skipped_lock: bool,
    /// Posted entries removed by compaction
    pub compacted: usize,
}

/// Single-instance drain loop
pub struct Worker<'r, C: Clock, S> {
    relay: &'r Relay<C>,
    sink: S,
}

impl<'r, C: Clock, S: Sink> Worker<'r, C, S> {
    pub fn new(relay: &'r Relay<C>, sink: S) -> Self {
        Self { relay, sink }
    }

    /// Deliver every unposted entry, lowest sequence first
    ///
    /// Exits immediately when another worker holds the run lock. Each entry
    /// is attempted at most once per run. After releasing the lock the queue
    /// is checked once more so entries appended during the release window are
    /// not stranded until the next capture.
    pub async fn drain(&self) -> Result<DrainReport, EngineError> {
        let mut report = DrainReport::default();
        let mut attempted = HashSet::new();
        let run_lock = self.relay.paths.run_lock();
        let mut first = true;

        loop {
            let Some(guard) = RunLock::try_acquire(&run_lock, LockPolicy::NON_BLOCKING)? else {
                if first {
                    tracing::info!(holder = ?RunLock::holder(&run_lock), "worker already running");
                    report.skipped_lock = true;
                }
                return Ok(report);
            };
            first = false;

            self.drain_locked(&mut report, &mut attempted).await?;

            match self.relay.store.compact(self.relay.config.worker.retention) {
                Ok(compacted) => report.compacted += compacted.removed,
                Err(e) => tracing::warn!(error = %e, "compaction failed"),
            }
            drop(guard);

            let arrived = self
                .relay
                .store
                .read_unposted()?
                .iter()
                .any(|entry| !attempted.contains(&entry.seq));
            if !arrived {
                break;
            }
            tracing::debug!("entries arrived after release, draining again");
        }

        tracing::info!(
            delivered = report.delivered,
            deduplicated = report.deduplicated,
            failed = report.failed.len(),
            "drain complete"
        );
        Ok(report)
    }

    async fn drain_locked(
        &self,
        report: &mut DrainReport,
        attempted: &mut HashSet<u64>,
    ) -> Result<(), EngineError> {
        let worker = &self.relay.config.worker;
        let mut delivery = Delivery::new(self.relay, &self.sink);
        let mut pause_next = false;

        loop {
            let pending: Vec<WalEntry> = self
                .relay
                .store
                .read_unposted()?
                .into_iter()
                .filter(|entry| !attempted.contains(&entry.seq))
                .collect();
            if pending.is_empty() {
                return Ok(());
            }
            delivery.refresh();

            for entry in pending {
                attempted.insert(entry.seq);
                if pause_next && !worker.pace.is_zero() {
                    tokio::time::sleep(worker.pace).await;
                }
                pause_next = false;

                match delivery.deliver(&entry, worker.max_attempts()).await {
                    Ok(Delivered::Posted(external_ref)) => {
                        tracing::info!(seq = entry.seq, %external_ref, "delivered");
                        report.delivered += 1;
                        pause_next = true;
                    }
                    Ok(Delivered::AlreadyPresent(external_ref)) => {
                        tracing::info!(seq = entry.seq, %external_ref, "already delivered");
                        report.deduplicated += 1;
                    }
                    Err(e) => {
                        tracing::warn!(seq = entry.seq, error = %e, "delivery failed, leaving unposted");
                        report.failed.push(entry.seq);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
