// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verifier: the termination gate
//!
//! Confirms that every entry captured since the last successful check made
//! it to the sink intact. Anything unconfirmed blocks with a diagnostic.

use crate::delivery::Delivery;
use crate::matching::{find_match, MatchKind};
use crate::{EngineError, Relay};
use std::fmt;
use trl_adapters::Sink;
use trl_core::{check_conformance, ChannelId, Clock, FormatViolation, Speaker, WalEntry};
use trl_storage::{LockPolicy, RunLock};

/// What is wrong with one entry
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    /// Not found remotely and inline delivery failed
    Undelivered(String),
    /// Not found remotely; a running worker holds the run lock
    InlineSkipped,
    /// Found remotely but malformed
    Nonconforming(Vec<FormatViolation>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub seq: u64,
    pub speaker: Speaker,
    pub channel: ChannelId,
    pub problem: Problem,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry {} ({}, channel {}): ", self.seq, self.speaker, self.channel)?;
        match &self.problem {
            Problem::Undelivered(reason) => write!(f, "not delivered: {reason}"),
            Problem::InlineSkipped => {
                write!(f, "not delivered yet; a worker is still draining")
            }
            Problem::Nonconforming(violations) => {
                let joined: Vec<String> = violations.iter().map(ToString::to_string).collect();
                write!(f, "delivered with format problems: {}", joined.join("; "))
            }
        }
    }
}

/// Gate decision
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Allow { checked: usize },
    Block(Vec<Finding>),
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow { .. })
    }

    /// Human-readable explanation of a block; empty when allowed
    pub fn diagnostic(&self) -> String {
        match self {
            Verdict::Allow { .. } => String::new(),
            Verdict::Block(findings) => {
                let mut out = format!(
                    "{} captured turn(s) not confirmed in the session log:",
                    findings.len()
                );
                for finding in findings {
                    out.push_str("\n  - ");
                    out.push_str(&finding.to_string());
                }
                out
            }
        }
    }
}

pub struct Verifier<'r, C: Clock, S> {
    relay: &'r Relay<C>,
    sink: S,
}

impl<'r, C: Clock, S: Sink> Verifier<'r, C, S> {
    pub fn new(relay: &'r Relay<C>, sink: S) -> Self {
        Self { relay, sink }
    }

    pub async fn verify(&self) -> Result<Verdict, EngineError> {
        let config = &self.relay.config.verify;
        if !config.wait.is_zero() {
            tokio::time::sleep(config.wait).await;
        }

        let checkpoint = self.relay.checkpoint();
        let since = checkpoint.load()?.last_seq;
        let entries: Vec<WalEntry> = self
            .relay
            .store
            .read_all()?
            .into_iter()
            .filter(|entry| entry.seq > since)
            .collect();
        let Some(last_seq) = entries.iter().map(|e| e.seq).max() else {
            return Ok(Verdict::Allow { checked: 0 });
        };

        let mut delivery = Delivery::new(self.relay, &self.sink);
        let mut findings = Vec::new();
        let mut unmatched = Vec::new();
        for entry in &entries {
            match self.check_remote(&mut delivery, entry).await {
                Some(Ok(())) => {}
                Some(Err(problem)) => findings.push(finding(entry, problem)),
                // Posted entries older than the listing window keep their recorded reference
                None if entry.posted => tracing::debug!(
                    seq = entry.seq,
                    external_ref = ?entry.external_ref,
                    "posted entry outside listing window"
                ),
                None => unmatched.push(entry),
            }
        }

        if !unmatched.is_empty() {
            self.deliver_inline(&mut delivery, &unmatched, &mut findings).await?;
        }

        if findings.is_empty() {
            checkpoint.update(|c| c.last_seq = c.last_seq.max(last_seq))?;
            tracing::info!(checked = entries.len(), last_seq, "verified");
            return Ok(Verdict::Allow {
                checked: entries.len(),
            });
        }

        findings.sort_by_key(|f| f.seq);
        tracing::warn!(findings = findings.len(), "verification blocked");
        Ok(Verdict::Block(findings))
    }

    /// Match `entry` remotely and check its format; `None` when no match was found
    async fn check_remote(
        &self,
        delivery: &mut Delivery<'_, C, S>,
        entry: &WalEntry,
    ) -> Option<Result<(), Problem>> {
        let verify = &self.relay.config.verify;
        let channel = delivery.known_channel(entry.channel)?;
        let remote = match delivery.remote_entries(channel).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(%channel, error = %e, "cannot list channel");
                return None;
            }
        };

        let (found, kind) = find_match(entry, remote, verify)?;
        if kind > MatchKind::Hash {
            tracing::debug!(seq = entry.seq, remote = %found.id, ?kind, "fuzzy match");
        }
        let violations = check_conformance(entry, &found.body, verify.similarity_threshold);
        if violations.is_empty() {
            Some(Ok(()))
        } else {
            Some(Err(Problem::Nonconforming(violations)))
        }
    }

    /// Last-resort delivery of unmatched entries, under the run lock
    async fn deliver_inline(
        &self,
        delivery: &mut Delivery<'_, C, S>,
        unmatched: &[&WalEntry],
        findings: &mut Vec<Finding>,
    ) -> Result<(), EngineError> {
        let run_lock = self.relay.paths.run_lock();
        let Some(_guard) = RunLock::try_acquire(&run_lock, LockPolicy::NON_BLOCKING)? else {
            tracing::info!(
                holder = ?RunLock::holder(&run_lock),
                "worker running, skipping inline delivery"
            );
            findings.extend(unmatched.iter().map(|e| finding(e, Problem::InlineSkipped)));
            return Ok(());
        };

        // A worker may have finished between the first look and taking the lock
        delivery.refresh();
        for entry in unmatched {
            if self.relay.store.get(entry.seq)?.is_some_and(|e| e.posted) {
                tracing::debug!(seq = entry.seq, "posted by a worker before inline delivery");
                continue;
            }
            match self.check_remote(delivery, entry).await {
                Some(Ok(())) => continue,
                Some(Err(problem)) => {
                    findings.push(finding(entry, problem));
                    continue;
                }
                None => {}
            }

            match delivery.deliver(entry, 1).await {
                Ok(delivered) => tracing::info!(
                    seq = entry.seq,
                    external_ref = delivered.external_ref(),
                    "delivered inline"
                ),
                Err(e) => {
                    findings.push(finding(entry, Problem::Undelivered(e.to_string())));
                }
            }
        }
        Ok(())
    }
}

fn finding(entry: &WalEntry, problem: Problem) -> Finding {
    Finding {
        seq: entry.seq,
        speaker: entry.speaker,
        channel: entry.channel,
        problem,
    }
}

#[cfg(test)]
#[path = "verifier_tests.rs"]
mod tests;
