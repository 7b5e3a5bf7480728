// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook payload read from stdin

use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

/// Fields the host passes to every hook; all optional
#[derive(Debug, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl HookInput {
    /// Read and parse stdin; empty input is an empty payload
    pub fn from_reader(mut reader: impl Read) -> anyhow::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(text)?)
    }

    pub fn require_transcript(&self) -> anyhow::Result<&PathBuf> {
        self.transcript_path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("hook input has no transcript_path"))
    }
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
