use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use taskdeck::clock::FixedClock;
use taskdeck::config::Config;
use taskdeck::edit::{EditUndo, FieldEdit};
use taskdeck::lock::{lock_path_for, FileLock};
use taskdeck::notify::NoopNotifier;
use taskdeck::storage::JsonTaskStore;
use taskdeck::{Error, Priority, SessionSettings, TaskSession};

fn open(dir: &std::path::Path, settings: SessionSettings) -> TaskSession<JsonTaskStore, NoopNotifier> {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 10, 8, 0, 0).unwrap());
    TaskSession::open(
        JsonTaskStore::new(dir).with_lock_timeout(100),
        NoopNotifier,
        Arc::new(clock),
        settings,
    )
    .unwrap()
}

#[test]
fn reopened_session_sees_same_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = open(dir.path(), SessionSettings::default());
    for (name, priority) in [("b", Priority::Low), ("a", Priority::High), ("c", Priority::None)] {
        let at = first.now();
        let mut edit = first.new_task().unwrap();
        edit.log_edit(FieldEdit::Description(name.to_string()), at);
        edit.log_edit(FieldEdit::Priority(priority), at);
        first.commit(edit).unwrap();
    }
    let expected: Vec<_> = first.index().flattened().to_vec();
    drop(first);

    let second = open(dir.path(), SessionSettings::default());
    assert_eq!(second.index().flattened(), expected.as_slice());
    assert_eq!(second.get(expected[0]).unwrap().description, "a");
}

#[test]
fn lock_contention_keeps_in_memory_change() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open(dir.path(), SessionSettings::default());
    let store_file = session.store().tasks_file();
    let _held = FileLock::acquire(lock_path_for(&store_file), 1000).unwrap();

    let at = session.now();
    let mut edit = session.new_task().unwrap();
    edit.log_edit(FieldEdit::Description("offline".to_string()), at);
    let err = session.commit(edit).unwrap_err();
    assert!(matches!(err, Error::LockFailed(_)));
    assert_eq!(session.index().len(), 1);
}

#[test]
fn coalescing_config_merges_description_steps() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[history]\ncoalesce_description = true\n").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();

    let mut session = open(dir.path(), SessionSettings::from(&config));
    let at = session.now();
    let mut edit = session.new_task().unwrap();
    for text in ["W", "Wr", "Write"] {
        edit.log_edit(FieldEdit::Description(text.to_string()), at);
    }
    edit.log_edit(FieldEdit::DueDate(Some(at + Duration::days(2))), at);
    assert_eq!(edit.depth(), 2);

    assert_eq!(edit.undo(), EditUndo::Restored(FieldEdit::DueDate(None)));
    assert_eq!(
        edit.undo(),
        EditUndo::Restored(FieldEdit::Description(String::new()))
    );
    assert_eq!(edit.undo(), EditUndo::AtSeed);
}
