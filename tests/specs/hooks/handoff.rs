//! Hand-off and recovery specs

use crate::prelude::*;

#[test]
fn recover_replays_turns_missed_before_restart() {
    let temp = Project::empty();
    let transcript = temp.write(
        "session.jsonl",
        &[user_line("first question"), assistant_line("first answer")].concat(),
    );
    let input = hook(serde_json::json!({"transcript_path": transcript}));
    temp.trl()
        .args(&["prompt"])
        .stdin(hook(serde_json::json!({"prompt": "first question"})))
        .passes();
    temp.trl().args(&["reply"]).stdin(input.clone()).passes();

    // The session ends before these turns are captured
    temp.append(
        &transcript,
        &[user_line("second question"), assistant_line("second answer")].concat(),
    );
    temp.trl().args(&["handoff"]).stdin(input).passes();
    assert!(temp.state_dir().join("handoff.json").exists());

    temp.trl().args(&["recover"]).stdin("").passes();
    assert_eq!(
        temp.wal_contents(),
        vec!["first question", "first answer", "second question", "second answer"]
    );
    assert!(!temp.state_dir().join("handoff.json").exists());

    // A second recovery has nothing to do
    temp.trl().args(&["recover"]).passes();
    assert_eq!(temp.wal().len(), 4);
}

#[test]
fn recover_without_marker_is_a_noop() {
    let temp = Project::empty();
    temp.trl().args(&["recover"]).passes().stdout_eq("");
    assert!(temp.wal().is_empty());
}

#[test]
fn status_shows_pending_handoff() {
    let temp = Project::empty();
    let transcript = temp.write("session.jsonl", "");
    temp.trl()
        .args(&["handoff"])
        .stdin(hook(serde_json::json!({"transcript_path": transcript})))
        .passes();
    temp.trl()
        .args(&["status"])
        .passes()
        .stdout_has("session.jsonl");
}
