//! Common test utilities and helpers
//!
//! Reusable helpers for driving the xiaomi-push binary in integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test command builder for the xiaomi-push CLI
pub struct TestCommand {
    cmd: Command,
}

impl TestCommand {
    /// Create a new test command for the xiaomi-push binary
    pub fn new() -> Self {
        let mut cmd = Command::cargo_bin("xiaomi-push").expect("Failed to find xiaomi-push binary");
        cmd.env_remove("XIAOMI_PUSH_CONFIG").env_remove("RUST_LOG");
        Self { cmd }
    }

    /// Add arguments to the command
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.cmd.arg(arg.as_ref());
        }
        self
    }

    /// Add a single argument to the command
    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.cmd.arg(arg.as_ref());
        self
    }

    /// Execute and expect success
    pub fn expect_success(mut self) -> TestAssertion {
        let assert = self.cmd.assert().success();
        TestAssertion { assert }
    }

    /// Execute and expect failure
    pub fn expect_failure(mut self) -> TestAssertion {
        let assert = self.cmd.assert().failure();
        TestAssertion { assert }
    }
}

impl Default for TestCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Test assertion wrapper with convenient methods
pub struct TestAssertion {
    assert: assert_cmd::assert::Assert,
}

impl TestAssertion {
    /// Assert stdout contains text
    pub fn stdout_contains<S: AsRef<str>>(self, text: S) -> Self {
        let assert = self.assert.stdout(predicate::str::contains(text.as_ref()));
        Self { assert }
    }

    /// Assert stdout does not contain text
    pub fn stdout_lacks<S: AsRef<str>>(self, text: S) -> Self {
        let assert = self
            .assert
            .stdout(predicate::str::contains(text.as_ref()).not());
        Self { assert }
    }

    /// Assert stderr contains text
    pub fn stderr_contains<S: AsRef<str>>(self, text: S) -> Self {
        let assert = self.assert.stderr(predicate::str::contains(text.as_ref()));
        Self { assert }
    }

    /// Finish the assertion
    pub fn done(self) -> assert_cmd::assert::Assert {
        self.assert
    }
}

/// Temporary directory holding a config file for one test
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
}

impl TestEnvironment {
    /// Create a new test environment with no config file yet
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_path = temp_dir.path().join("config.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    /// Write a config pointing at `base_url` with fast retries
    pub fn with_gateway(base_url: &str) -> Self {
        let env = Self::new();
        env.write_config(&format!(
            r#"
[xiaomi]
app_secret = "test-secret"
notify_foreground = 1
base_url = "{base_url}"
timeout_ms = 1000

[xiaomi.retry]
max_attempts = 2
delay_ms = 10

[logging]
level = "warn"
"#
        ));
        env
    }

    pub fn write_config(&self, content: &str) {
        std::fs::write(&self.config_path, content).expect("Failed to write config");
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a command configured for this environment
    pub fn command(&self) -> TestCommand {
        TestCommand::new()
            .arg("--config")
            .arg(self.config_path.to_string_lossy())
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
