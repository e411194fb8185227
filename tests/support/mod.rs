#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use taskdeck::storage::{TaskFile, TASKS_FILE};
use taskdeck::Task;
use tempfile::TempDir;

/// A throwaway data directory plus helpers for driving `td` against it
pub struct TestDeck {
    dir: TempDir,
}

impl TestDeck {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `td` with its data directory pointed at this deck
    pub fn td(&self) -> Command {
        let mut cmd = Command::cargo_bin("td").expect("binary");
        cmd.env("TASKDECK_DIR", self.dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Run `td --json <args>` and return the parsed envelope.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .td()
            .arg("--json")
            .args(args)
            .output()
            .expect("run td");
        serde_json::from_slice(&output.stdout).expect("json envelope")
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join("config.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.dir.path().join(TASKS_FILE)
    }

    pub fn read_tasks(&self) -> Vec<Task> {
        let path = self.tasks_file();
        if !path.exists() {
            return Vec::new();
        }
        let raw = fs::read_to_string(path).expect("read tasks");
        let file: TaskFile = serde_json::from_str(&raw).expect("parse tasks");
        file.tasks
    }
}
