//! Capture hook specs: `trl prompt` and `trl reply`

use crate::prelude::*;

#[test]
fn prompt_is_captured_silently() {
    let temp = Project::empty();
    temp.trl()
        .args(&["prompt"])
        .env("TRL_CHANNEL", "42")
        .stdin(hook(serde_json::json!({"session_id": "s1", "prompt": "hello"})))
        .passes()
        .stdout_eq("");

    let wal = temp.wal();
    assert_eq!(wal.len(), 1);
    assert_eq!(wal[0]["seq"], 1);
    assert_eq!(wal[0]["speaker"], "local");
    assert_eq!(wal[0]["channel"], 42);
    assert_eq!(wal[0]["content"], "hello");
    assert_eq!(wal[0]["posted"], false);
    assert_eq!(wal[0]["external_ref"], serde_json::Value::Null);
    assert_eq!(wal[0]["hash"].as_str().unwrap().len(), 16);
}

#[test]
fn repeated_prompt_is_stored_once() {
    let temp = Project::empty();
    for prompt in ["Run the tests", "run   the TESTS"] {
        temp.trl()
            .args(&["prompt"])
            .stdin(hook(serde_json::json!({"prompt": prompt})))
            .passes();
    }
    assert_eq!(temp.wal_contents(), vec!["Run the tests"]);
}

#[test]
fn bad_hook_input_never_fails_the_host() {
    let temp = Project::empty();
    temp.trl().args(&["prompt"]).stdin("").passes();
    temp.trl().args(&["prompt"]).stdin("{not json").passes();
    temp.trl()
        .args(&["reply"])
        .stdin(hook(serde_json::json!({"session_id": "s1"})))
        .passes();
    temp.trl()
        .args(&["prompt"])
        .env("TRL_CHANNEL", "abc")
        .stdin(hook(serde_json::json!({"prompt": "x"})))
        .passes();
    assert!(temp.wal().is_empty());
}

#[test]
fn reply_captures_only_new_assistant_turns() {
    let temp = Project::empty();
    let transcript = temp.write(
        "session.jsonl",
        &[user_line("what changed?"), assistant_line("Two files.")].concat(),
    );
    let input = hook(serde_json::json!({"transcript_path": transcript}));

    temp.trl().args(&["reply"]).stdin(input.clone()).passes();
    temp.trl().args(&["reply"]).stdin(input.clone()).passes();
    assert_eq!(temp.wal_contents(), vec!["Two files."]);

    temp.append(&transcript, &[user_line("and?"), assistant_line("That is all.")].concat());
    temp.trl().args(&["reply"]).stdin(input).passes();
    assert_eq!(temp.wal_contents(), vec!["Two files.", "That is all."]);
    assert!(temp.wal().iter().all(|e| e["speaker"] == "counterpart"));
}

#[test]
fn prompts_and_replies_share_one_sequence() {
    let temp = Project::empty();
    let transcript = temp.write("session.jsonl", &user_line("q"));
    temp.trl()
        .args(&["prompt"])
        .stdin(hook(serde_json::json!({"prompt": "q"})))
        .passes();
    temp.append(&transcript, &assistant_line("a"));
    temp.trl()
        .args(&["reply"])
        .stdin(hook(serde_json::json!({"transcript_path": transcript})))
        .passes();

    let seqs: Vec<_> = temp.wal().iter().map(|e| e["seq"].as_u64().unwrap()).collect();
    assert_eq!(seqs, vec![1, 2]);
}
