// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{assistant_line, tool_result_line, user_line};
use std::io::Write;

#[test]
fn empty_input_has_no_turns() {
    let chunk = parse_chunk(b"", 0);
    assert!(chunk.turns.is_empty());
    assert_eq!(chunk.end, 0);
}

#[test]
fn user_then_assistant() {
    let text = format!("{}{}", user_line("hello"), assistant_line("hi there"));
    let chunk = parse_chunk(text.as_bytes(), 0);

    assert_eq!(chunk.turns.len(), 2);
    assert_eq!(chunk.turns[0].speaker, Speaker::Local);
    assert_eq!(chunk.turns[0].text, "hello");
    assert_eq!(chunk.turns[0].end, user_line("hello").len() as u64);
    assert_eq!(chunk.turns[1].speaker, Speaker::Counterpart);
    assert_eq!(chunk.turns[1].text, "hi there");
    assert_eq!(chunk.end, text.len() as u64);
}

#[test]
fn assistant_blocks_across_tool_use_form_one_turn() {
    let text = [
        user_line("fix it"),
        assistant_line("Looking."),
        tool_result_line(),
        assistant_line("Fixed."),
        user_line("thanks"),
    ]
    .concat();
    let chunk = parse_chunk(text.as_bytes(), 0);

    let texts: Vec<_> = chunk.turns.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["fix it", "Looking.\n\nFixed.", "thanks"]);
    let reply_end = [
        user_line("fix it"),
        assistant_line("Looking."),
        tool_result_line(),
        assistant_line("Fixed."),
    ]
    .concat()
    .len() as u64;
    assert_eq!(chunk.turns[1].end, reply_end);
}

#[test]
fn partial_trailing_line_is_not_consumed() {
    let complete = user_line("first");
    let text = format!("{}{}", complete, r#"{"type":"assistant","message":{"con"#);
    let chunk = parse_chunk(text.as_bytes(), 10);

    assert_eq!(chunk.turns.len(), 1);
    assert_eq!(chunk.end, 10 + complete.len() as u64);
}

#[test]
fn meta_and_garbage_lines_are_skipped() {
    let text = [
        r#"{"type":"user","isMeta":true,"message":{"content":"<system>"}}"#.to_string() + "\n",
        "not json\n".to_string(),
        r#"{"type":"summary","summary":"x"}"#.to_string() + "\n",
        user_line("real"),
    ]
    .concat();
    let chunk = parse_chunk(text.as_bytes(), 0);
    assert_eq!(chunk.turns.len(), 1);
    assert_eq!(chunk.turns[0].text, "real");
}

#[test]
fn block_content_uses_text_blocks_only() {
    let line = r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"hmm"},{"type":"text","text":"  answer  "},{"type":"tool_use","name":"Bash"}]}}"#;
    let chunk = parse_chunk(format!("{line}\n").as_bytes(), 0);
    assert_eq!(chunk.turns[0].text, "answer");
}

#[test]
fn read_from_offset_only_sees_new_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(user_line("one").as_bytes()).unwrap();
    file.write_all(assistant_line("two").as_bytes()).unwrap();

    let first = read_from(&path, 0).unwrap();
    assert_eq!(first.turns.len(), 2);

    file.write_all(assistant_line("three").as_bytes()).unwrap();
    let second = read_from(&path, first.end).unwrap();
    assert_eq!(second.turns.len(), 1);
    assert_eq!(second.turns[0].text, "three");
}

#[test]
fn read_from_past_end_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.jsonl");
    std::fs::write(&path, user_line("again")).unwrap();

    let chunk = read_from(&path, 10_000).unwrap();
    assert_eq!(chunk.turns.len(), 1);
}

#[test]
fn missing_transcript_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_from(&dir.path().join("nope.jsonl"), 0).is_err());
}
