//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for driving the `tf` CLI against an isolated
//! runtime directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::process::Output;

use assert_cmd::Command;
use tf_core::{BackgroundMode, Task, TaskStatus};
use tf_storage::CheckpointStore;

pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions.
pub struct CliBuilder {
    args: Vec<String>,
    runtime_dir: Option<std::path::PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            runtime_dir: None,
            envs: Vec::new(),
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn runtime_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    fn command(self) -> Command {
        let mut cmd = Command::cargo_bin("tf").expect("tf binary should build");
        cmd.args(&self.args);
        cmd.env("NO_COLOR", "1");
        if let Some(dir) = self.runtime_dir {
            cmd.env("BGTASK_RUNTIME_DIR", dir);
        }
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run, for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{expected}'\nstdout: {stdout}"
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{unexpected}'\nstdout: {stdout}"
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{expected}'\nstderr: {stderr}"
        );
        self
    }
}

/// An isolated runtime directory with a checkpoint store, for seeding
/// fixture tasks ahead of a CLI invocation.
pub struct Runtime {
    dir: tempfile::TempDir,
    store: CheckpointStore,
}

impl Runtime {
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        Self { dir, store }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tf(&self) -> CliBuilder {
        cli().runtime_dir(self.path())
    }

    /// Seed a task directly into the checkpoint store, bypassing the
    /// manager's lifecycle (as the CLI has no way to launch a task itself).
    pub fn seed(&self, task: Task) -> Task {
        self.store.write_task(&task).unwrap();
        task
    }

    pub fn read(&self, id: &str) -> Option<Task> {
        self.store.read_task(&tf_core::TaskId::new(id)).unwrap()
    }
}

/// Build a fixture task in the given status, with a generated id.
pub fn fixture_task(description: &str, status: TaskStatus) -> Task {
    let mut task = Task::builder()
        .id(format!("bg_{}", unique_suffix()))
        .status(status)
        .background_mode(BackgroundMode::WorkerProcess)
        .build();
    task.description = description.to_string();
    task
}

/// A tiny, dependency-free id generator: tests only need uniqueness within
/// a single process run, not cryptographic randomness.
fn unique_suffix() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("test{:06}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[allow(dead_code)]
pub fn empty_payload() -> HashMap<String, serde_json::Value> {
    HashMap::new()
}
