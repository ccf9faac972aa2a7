//! Common test utilities for pipesh integration tests

#![allow(dead_code)]

pub use pipesh::{parse, segment_code, Config, Flow, SegmentCode, Shell, Status};

use assert_cmd::Command;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// A shell with default configuration
pub fn shell() -> Shell {
    Shell::new(Config::default_config())
}

/// Execute a line in a fresh shell and return its status
pub fn run(line: &str) -> Status {
    status(shell().execute(line).unwrap())
}

/// Unwrap the status of a line that did not exit the shell
pub fn status(flow: Flow) -> Status {
    match flow {
        Flow::Continue(status) => status,
        Flow::Exit(code) => panic!("unexpected exit {}", code),
    }
}

/// Reap background jobs until one finishes or a few seconds pass
pub fn wait_for_job(shell: &mut Shell) -> Vec<pipesh::Finished> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let finished = shell.reap_finished();
        if !finished.is_empty() || Instant::now() > deadline {
            return finished;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// The pipesh binary, isolated from the user's config and history
pub fn pipesh(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pipesh").unwrap();
    cmd.env("HOME", home.path()).env_remove("PIPESH_CONFIG");
    cmd
}
