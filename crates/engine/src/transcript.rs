// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript parsing
//!
//! The host appends one JSON object per line. Only complete lines are read,
//! so a line being written while we read is picked up on the next call.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use trl_core::Speaker;

/// One conversational turn extracted from a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// Byte offset just past the last line contributing to this turn
    pub end: u64,
}

/// Turns found after an offset, plus the offset of the first unread byte
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptChunk {
    pub turns: Vec<Turn>,
    pub end: u64,
}

/// Read turns starting at byte `offset`
///
/// An offset past the end of the file means the transcript was replaced;
/// reading restarts from the beginning.
pub fn read_from(path: &Path, offset: u64) -> io::Result<TranscriptChunk> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let start = if offset > len {
        tracing::warn!(
            path = %path.display(),
            offset,
            len,
            "transcript shorter than watermark, rereading"
        );
        0
    } else {
        offset
    };

    file.seek(SeekFrom::Start(start))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(parse_chunk(&bytes, start))
}

/// Parse complete lines of `bytes`, which begin at byte `base` of the transcript
pub fn parse_chunk(bytes: &[u8], base: u64) -> TranscriptChunk {
    let complete = match bytes.iter().rposition(|b| *b == b'\n') {
        Some(last) => &bytes[..=last],
        None => &[][..],
    };

    let mut turns = Vec::new();
    let mut pending: Option<Turn> = None;
    let mut offset = base;

    for raw in complete.split_inclusive(|b| *b == b'\n') {
        offset += raw.len() as u64;
        let Ok(line) = std::str::from_utf8(raw) else {
            continue;
        };
        match parse_line(line.trim()) {
            Piece::User(text) => {
                turns.extend(pending.take());
                turns.push(Turn {
                    speaker: Speaker::Local,
                    text,
                    end: offset,
                });
            }
            Piece::Assistant(text) => match &mut pending {
                Some(turn) => {
                    turn.text.push_str("\n\n");
                    turn.text.push_str(&text);
                    turn.end = offset;
                }
                None => {
                    pending = Some(Turn {
                        speaker: Speaker::Counterpart,
                        text,
                        end: offset,
                    })
                }
            },
            Piece::Other => {}
        }
    }
    turns.extend(pending);

    TranscriptChunk {
        turns,
        end: base + complete.len() as u64,
    }
}

enum Piece {
    User(String),
    Assistant(String),
    Other,
}

fn parse_line(line: &str) -> Piece {
    if line.is_empty() {
        return Piece::Other;
    }
    let Ok(json) = serde_json::from_str::<serde_json::Value>(line) else {
        return Piece::Other;
    };
    if json.get("isMeta").and_then(|v| v.as_bool()) == Some(true) {
        return Piece::Other;
    }

    let Some(content) = json.get("message").and_then(|m| m.get("content")) else {
        return Piece::Other;
    };
    let Some(text) = message_text(content) else {
        return Piece::Other;
    };

    match json.get("type").and_then(|v| v.as_str()) {
        Some("user") => Piece::User(text),
        Some("assistant") => Piece::Assistant(text),
        _ => Piece::Other,
    }
}

/// Text of a message: a plain string, or the `text` blocks of a block list
///
/// Messages carrying only tool traffic have no text.
fn message_text(content: &serde_json::Value) -> Option<String> {
    let text = match content {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
