mod support;

use predicates::str::contains;
use support::TestDeck;
use taskdeck::Priority;

fn envelopes(stdout: &[u8]) -> Vec<serde_json::Value> {
    serde_json::Deserializer::from_slice(stdout)
        .into_iter::<serde_json::Value>()
        .collect::<Result<_, _>>()
        .expect("json envelopes")
}

#[test]
fn undo_add_twice_reports_nothing_to_undo() {
    let deck = TestDeck::new();
    deck.td()
        .arg("shell")
        .write_stdin("add buy milk\nundo add\nundo add\nquit\n")
        .assert()
        .success()
        .stdout(contains("Added task 1"))
        .stdout(contains("Removed task 1 (undo add)"))
        .stderr(contains("No add to undo"));

    assert!(deck.read_tasks().is_empty());
}

#[test]
fn undo_edit_restores_previous_fields() {
    let deck = TestDeck::new();
    let script = "add report -p H\n\
                  add email -p M\n\
                  edit 1 -p L --description \"report v2\"\n\
                  undo edit\n\
                  quit\n";
    deck.td()
        .arg("shell")
        .write_stdin(script)
        .assert()
        .success()
        .stdout(contains("Edited task 1"))
        .stdout(contains("Restored task 1 (undo edit)"));

    let tasks = deck.read_tasks();
    let report = tasks.iter().find(|t| t.id.get() == 1).unwrap();
    assert_eq!(report.description, "report");
    assert_eq!(report.priority, Priority::High);
}

#[test]
fn filter_and_reset_follow_the_index() {
    let deck = TestDeck::new();
    let output = deck
        .td()
        .args(["--json", "shell"])
        .write_stdin("add Pay rent\nadd walk dog\nfilter PAY\nadd pay invoice -p H\nlist\nreset\n")
        .output()
        .expect("run shell");
    assert!(output.status.success());

    let envelopes = envelopes(&output.stdout);
    assert_eq!(envelopes.len(), 6);

    let filtered = &envelopes[2]["data"];
    assert_eq!(filtered["total"], 1);
    assert_eq!(filtered["filter"], "pay");

    let refreshed = &envelopes[4]["data"];
    assert_eq!(refreshed["total"], 2);
    assert_eq!(refreshed["tasks"][0]["description"], "pay invoice");

    let reset = &envelopes[5]["data"];
    assert_eq!(reset["total"], 3);
    assert!(reset.get("filter").is_none());
}

#[test]
fn bad_lines_do_not_end_the_session() {
    let deck = TestDeck::new();
    deck.td()
        .arg("shell")
        .write_stdin("bogus\nadd \"unterminated\nshow 9\nadd still works\n")
        .assert()
        .success()
        .stderr(contains("unterminated quote"))
        .stderr(contains("Task not found: 9"))
        .stdout(contains("Added task 1"));

    assert_eq!(deck.read_tasks().len(), 1);
}

#[test]
fn undo_is_scoped_to_the_shell_session() {
    let deck = TestDeck::new();
    deck.td().args(["add", "outside"]).assert().success();
    deck.td()
        .arg("shell")
        .write_stdin("undo add\n")
        .assert()
        .success()
        .stderr(contains("No add to undo"));
    assert_eq!(deck.read_tasks().len(), 1);
}

#[test]
fn rejected_adds_do_not_consume_ids() {
    let deck = TestDeck::new();
    let script = "add \"   \"\n\
                  add chores --tag \"two words\"\n\
                  add kept\n\
                  add \"say \\\"hi\\\"\" --tag 'home'\n\
                  quit\n";
    deck.td()
        .arg("shell")
        .write_stdin(script)
        .assert()
        .success()
        .stderr(contains("description cannot be empty"))
        .stderr(contains("invalid tag"))
        .stdout(contains("Added task 1"))
        .stdout(contains("Added task 2"));

    let tasks = deck.read_tasks();
    let ids: Vec<u64> = tasks.iter().map(|t| t.id.get()).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(tasks[0].description, "kept");
    assert_eq!(tasks[1].description, "say \"hi\"");
    assert!(tasks[1].tags.contains("home"));
}
