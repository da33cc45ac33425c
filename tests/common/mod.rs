//! Common test utilities for cairn integration tests.
//!
//! Provides `TestEnv` for isolated project directories so tests never
//! touch the user's real manifests or action log.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with an isolated project directory.
///
/// The `cn()` method returns a `Command` running in the project directory
/// with action logging disabled, making tests parallel-safe.
pub struct TestEnv {
    pub project_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated directory.
    pub fn new() -> Self {
        Self {
            project_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize a manifest.
    pub fn init() -> Self {
        let env = Self::new();
        env.cn().arg("init").assert().success();
        env
    }

    /// Get a Command for the cn binary in the project directory.
    pub fn cn(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cn"));
        cmd.current_dir(self.project_dir.path());
        cmd.env("CN_ACTION_LOG", "off");
        cmd
    }

    /// Get the path to the project directory.
    pub fn path(&self) -> &std::path::Path {
        self.project_dir.path()
    }

    /// Write a batch file into the project directory and return its path.
    pub fn write_batch(&self, name: &str, contents: &str) -> std::path::PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Seed two tasks: TASK-001 (completed) and TASK-002 (pending).
    pub fn seed_two_tasks(&self) {
        self.cn()
            .args(["task", "add", "First", "--description", "seed task one"])
            .assert()
            .success();
        self.cn()
            .args(["task", "add", "Second", "--description", "seed task two"])
            .assert()
            .success();
        self.cn()
            .args(["task", "status", "TASK-001", "completed"])
            .assert()
            .success();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
