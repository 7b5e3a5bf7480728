// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Matching WAL entries to remote entries
//!
//! The sink may rewrite what it stores (links, quoting, whitespace), so
//! beyond the exact hash an entry also matches on a shared normalized
//! prefix or on key-term overlap.

use trl_adapters::RemoteEntry;
use trl_core::content::signatures_agree;
use trl_core::render::body_hash;
use trl_core::{extract_content, salient_terms, signature, term_coverage, VerifyConfig, WalEntry};

/// Which rule matched, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    ExternalRef,
    Hash,
    Signature,
    Similarity,
}

/// Best remote counterpart of `entry`, trying each rule over all of `remote` in turn
pub fn find_match<'a>(
    entry: &WalEntry,
    remote: &'a [RemoteEntry],
    config: &VerifyConfig,
) -> Option<(&'a RemoteEntry, MatchKind)> {
    if let Some(external_ref) = &entry.external_ref {
        if let Some(found) = remote.iter().find(|r| &r.id == external_ref) {
            return Some((found, MatchKind::ExternalRef));
        }
    }

    if let Some(found) = remote.iter().find(|r| body_hash(&r.body) == entry.hash) {
        return Some((found, MatchKind::Hash));
    }

    let wanted = signature(&entry.content, config.signature_len);
    let min_len = config.min_signature_len.min(config.signature_len);
    if let Some(found) = remote.iter().find(|r| {
        let got = signature(extract_content(&r.body), config.signature_len);
        signatures_agree(&wanted, &got, min_len)
    }) {
        return Some((found, MatchKind::Signature));
    }

    let terms = salient_terms(&entry.content);
    remote
        .iter()
        .find(|r| {
            term_coverage(&terms, extract_content(&r.body))
                .is_some_and(|coverage| coverage >= config.similarity_threshold)
        })
        .map(|found| (found, MatchKind::Similarity))
}

#[cfg(test)]
#[path = "matching_tests.rs"]
mod tests;
