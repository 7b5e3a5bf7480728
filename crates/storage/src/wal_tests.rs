// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeSet;
use trl_core::FakeClock;

fn setup() -> (tempfile::TempDir, StatePaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = StatePaths::at(dir.path()).unwrap();
    (dir, paths)
}

fn store(paths: &StatePaths) -> WalStore {
    WalStore::open(paths, LockPolicy::default())
}

#[test]
fn appended_entries_read_back_unposted_in_order() {
    let (_dir, paths) = setup();
    let wal = store(&paths);

    assert_eq!(wal.append(Speaker::Local, ChannelId(0), "hello", None).unwrap(), 1);
    assert_eq!(
        wal.append(Speaker::Counterpart, ChannelId(0), "hi there", None).unwrap(),
        2
    );

    let unposted = wal.read_unposted().unwrap();
    assert_eq!(unposted.len(), 2);
    assert_eq!(unposted[0].seq, 1);
    assert_eq!(unposted[0].speaker, Speaker::Local);
    assert_eq!(unposted[1].seq, 2);
    assert_eq!(unposted[1].content, "hi there");
    assert!(unposted.iter().all(|e| e.channel == ChannelId(0)));
}

#[test]
fn mark_posted_updates_only_the_target_entry() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    wal.append(Speaker::Local, ChannelId(0), "hello", None).unwrap();
    wal.append(Speaker::Counterpart, ChannelId(0), "hi there", None).unwrap();
    let before = wal.read_all().unwrap();

    assert!(wal.mark_posted(1, "ext-123").unwrap());

    let after = wal.read_all().unwrap();
    assert!(after[0].posted);
    assert_eq!(after[0].external_ref.as_deref(), Some("ext-123"));
    assert_eq!(after[1], before[1]);
    assert_eq!(wal.read_unposted().unwrap().len(), 1);
}

#[test]
fn mark_posted_unknown_seq_returns_false() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    wal.append(Speaker::Local, ChannelId(1), "hello", None).unwrap();
    assert!(!wal.mark_posted(99, "ext").unwrap());
}

#[test]
fn mark_posted_rejects_empty_reference() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    wal.append(Speaker::Local, ChannelId(1), "hello", None).unwrap();
    assert!(matches!(
        wal.mark_posted(1, " "),
        Err(StorageError::EmptyExternalRef { seq: 1 })
    ));
    assert!(!wal.read_all().unwrap()[0].posted);
}

#[test]
fn mark_posted_keeps_first_reference() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    wal.append(Speaker::Local, ChannelId(1), "hello", None).unwrap();
    assert!(wal.mark_posted(1, "first").unwrap());
    assert!(wal.mark_posted(1, "second").unwrap());
    assert_eq!(wal.get(1).unwrap().unwrap().external_ref.as_deref(), Some("first"));
}

#[test]
fn interrupted_rewrite_leaves_original_intact() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    wal.append(Speaker::Local, ChannelId(1), "one", None).unwrap();
    wal.append(Speaker::Local, ChannelId(1), "two", None).unwrap();
    let original = std::fs::read(wal.path()).unwrap();

    // Temp file fully written, process dies before the rename
    let mut records = wal.load_records().unwrap();
    if let Some(entry) = records[0].entry.as_mut() {
        entry.mark_posted("ext-1");
    }
    records[0].dirty = true;
    let tmp = wal.write_temp(&records).unwrap();
    assert!(tmp.exists());

    assert_eq!(std::fs::read(wal.path()).unwrap(), original);
    assert!(wal.read_all().unwrap().iter().all(|e| !e.posted));

    // A later rewrite overwrites the stale temp file and succeeds
    assert!(wal.mark_posted(2, "ext-2").unwrap());
    let entries = wal.read_all().unwrap();
    assert!(!entries[0].posted);
    assert!(entries[1].posted);
}

#[test]
fn duplicate_content_is_detected_by_hash() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    wal.append(Speaker::Local, ChannelId(1), "Same  Content", None).unwrap();

    assert!(wal.contains_hash(&ContentHash::of("same content")).unwrap());
    assert!(!wal.contains_hash(&ContentHash::of("other")).unwrap());
    assert_eq!(wal.hashes().unwrap().len(), 1);
}

#[test]
fn malformed_lines_are_skipped_and_preserved() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    wal.append(Speaker::Local, ChannelId(1), "one", None).unwrap();
    {
        let mut file = OpenOptions::new().append(true).open(wal.path()).unwrap();
        writeln!(file, "{{not json").unwrap();
    }
    wal.append(Speaker::Local, ChannelId(1), "two", None).unwrap();

    let scan = wal.scan().unwrap();
    assert_eq!(scan.entries.len(), 2);
    assert_eq!(scan.malformed, 1);

    wal.mark_posted(1, "ext-1").unwrap();
    let text = std::fs::read_to_string(wal.path()).unwrap();
    assert!(text.contains("{not json"));
    assert_eq!(wal.scan().unwrap().malformed, 1);
}

#[test]
fn torn_append_does_not_corrupt_next_record() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    wal.append(Speaker::Local, ChannelId(1), "one", None).unwrap();
    {
        let mut file = OpenOptions::new().append(true).open(wal.path()).unwrap();
        file.write_all(br#"{"seq":2,"ts":"2026"#).unwrap();
    }

    let seq = wal.append(Speaker::Local, ChannelId(1), "two", None).unwrap();
    let scan = wal.scan().unwrap();
    assert_eq!(scan.malformed, 1);
    assert_eq!(scan.entries.last().unwrap().seq, seq);
    assert_eq!(scan.entries.last().unwrap().content, "two");
}

#[test]
fn sequence_never_reuses_ids_when_counter_is_lost() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    wal.append(Speaker::Local, ChannelId(1), "one", None).unwrap();
    wal.append(Speaker::Local, ChannelId(1), "two", None).unwrap();
    std::fs::remove_file(paths.counter()).unwrap();

    assert_eq!(wal.append(Speaker::Local, ChannelId(1), "three", None).unwrap(), 3);
}

#[test]
fn append_fails_instead_of_blocking_when_locked() {
    let (_dir, paths) = setup();
    let wal = WalStore::open(&paths, LockPolicy::new(2, Duration::from_millis(1)));
    let _held = FileLock::try_acquire(&paths.wal_lock()).unwrap();

    let err = wal.append(Speaker::Local, ChannelId(1), "x", None).unwrap_err();
    assert!(err.is_lock_busy());
    assert!(wal.read_all().unwrap().is_empty());
}

#[test]
fn append_fails_when_sequencer_is_contended() {
    let (_dir, paths) = setup();
    let wal = WalStore::open(&paths, LockPolicy::new(2, Duration::from_millis(1)));
    let _held = FileLock::try_acquire(&paths.counter_lock()).unwrap();

    assert!(wal
        .append(Speaker::Local, ChannelId(1), "x", None)
        .unwrap_err()
        .is_lock_busy());
}

#[test]
fn concurrent_appends_get_distinct_increasing_seqs() {
    let (_dir, paths) = setup();
    let policy = LockPolicy::new(10_000, Duration::from_millis(1));

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let paths = paths.clone();
            std::thread::spawn(move || {
                WalStore::open(&paths, policy)
                    .append(Speaker::Local, ChannelId(1), &format!("turn {}", i), None)
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let entries = store(&paths).read_all().unwrap();
    assert_eq!(entries.len(), 32);
    let seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]), "file order must be seq order: {:?}", seqs);
    assert_eq!(
        seqs.iter().copied().collect::<BTreeSet<_>>(),
        (1..=32).collect::<BTreeSet<_>>()
    );
}

#[test]
fn compaction_drops_only_stale_posted_entries() {
    let (_dir, paths) = setup();
    let clock = FakeClock::new();
    let wal = WalStore::with_clock(&paths, LockPolicy::default(), clock.clone());

    wal.append(Speaker::Local, ChannelId(1), "old posted", None).unwrap();
    wal.append(Speaker::Local, ChannelId(1), "old pending", None).unwrap();
    wal.mark_posted(1, "ext-1").unwrap();

    clock.advance(Duration::from_secs(10 * 24 * 60 * 60));
    wal.append(Speaker::Local, ChannelId(1), "new posted", None).unwrap();
    wal.mark_posted(3, "ext-3").unwrap();

    let report = wal.compact(Duration::from_secs(7 * 24 * 60 * 60)).unwrap();
    assert_eq!(report, CompactReport { kept: 2, removed: 1 });

    let seqs: Vec<u64> = wal.read_all().unwrap().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![2, 3]);
}

#[test]
fn compaction_never_drops_unposted_entries() {
    let (_dir, paths) = setup();
    let clock = FakeClock::new();
    let wal = WalStore::with_clock(&paths, LockPolicy::default(), clock.clone());
    wal.append(Speaker::Local, ChannelId(1), "ancient", None).unwrap();

    clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
    let report = wal.compact(Duration::ZERO).unwrap();

    assert_eq!(report.removed, 0);
    assert_eq!(wal.read_unposted().unwrap().len(), 1);
}

#[test]
fn next_seq_continues_after_compaction() {
    let (_dir, paths) = setup();
    let clock = FakeClock::new();
    let wal = WalStore::with_clock(&paths, LockPolicy::default(), clock.clone());
    wal.append(Speaker::Local, ChannelId(1), "a", None).unwrap();
    wal.mark_posted(1, "ext-1").unwrap();
    clock.advance(Duration::from_secs(60));
    wal.compact(Duration::from_secs(1)).unwrap();

    assert_eq!(wal.append(Speaker::Local, ChannelId(1), "b", None).unwrap(), 2);
}

#[test]
fn read_missing_log_is_empty() {
    let (_dir, paths) = setup();
    let wal = store(&paths);
    assert!(wal.read_all().unwrap().is_empty());
    assert_eq!(wal.last_seq().unwrap(), None);
}
