//! Integration tests for running lines through the engine

#[path = "common/mod.rs"]
mod common;
use common::{run, shell, status, wait_for_job, Status};
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

#[test]
fn test_redirection_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");

    run(&format!("echo hello > {}", first.display()));
    run(&format!("cat < {} > {}", first.display(), second.display()));
    assert_eq!(fs::read_to_string(&second).unwrap(), "hello\n");
}

#[test]
fn test_output_redirect_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    fs::write(&out, "a much longer previous content\n").unwrap();
    run(&format!("echo new > {}", out.display()));
    assert_eq!(fs::read_to_string(&out).unwrap(), "new\n");
}

#[test]
fn test_error_redirect_leaves_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let err = dir.path().join("err.txt");
    let out = dir.path().join("out.txt");
    run(&format!("echo a 2> {} > {}", err.display(), out.display()));
    assert_eq!(fs::read_to_string(&err).unwrap(), "");
    assert_eq!(fs::read_to_string(&out).unwrap(), "a\n");
}

/// Chain three processes by hand, the way the shell should
fn chained(input: &str) -> String {
    let mut sort = Command::new("sort")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    sort.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    let tr = Command::new("tr")
        .args(["a-z", "A-Z"])
        .stdin(sort.stdout.take().unwrap())
        .output()
        .unwrap();
    sort.wait().unwrap();
    String::from_utf8(tr.stdout).unwrap()
}

#[test]
fn test_three_stage_pipe_matches_manual_chain() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let status = run(&format!(
        "printf %s\\n pear apple fig | sort | tr a-z A-Z > {}",
        out.display()
    ));
    assert_eq!(status, Status::Exited(0));
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        chained("pear\napple\nfig\n")
    );
}

#[test]
fn test_pipe_status_is_last_stage() {
    assert_eq!(run("true | true | false"), Status::Exited(1));
    assert_eq!(run("false | false | true"), Status::Exited(0));
}

#[test]
fn test_missing_program() {
    let status = run("pipesh-missing-program-abc arg");
    assert_eq!(status, Status::SpawnFailed);
    assert_eq!(status.code(), 127);
}

#[test]
fn test_failing_stage_does_not_stop_line() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("f.txt");
    let status = run(&format!(
        "echo x ; cat < {}/missing ; echo y > {}",
        dir.path().display(),
        out.display()
    ));
    assert_eq!(status, Status::Exited(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "y\n");
}

#[test]
fn test_glob_without_match_runs_literal_command() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = format!("{}/*.nonexistent", dir.path().display());
    // ls is handed the literal pattern and fails on it, but it does run
    let status = run(&format!("ls {}", pattern));
    assert!(matches!(status, Status::Exited(code) if code != 0));
}

#[test]
fn test_glob_runs_each_match_in_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("1.txt"), "marker\n").unwrap();
    fs::write(dir.path().join("2.txt"), "other\n").unwrap();
    fs::write(dir.path().join("3.txt"), "marker\n").unwrap();
    let pattern = format!("{}/?.txt", dir.path().display());

    assert_eq!(run(&format!("grep -q marker {}", pattern)), Status::Exited(0));
    assert_eq!(run(&format!("grep -q other {}", pattern)), Status::Exited(1));
}

#[test]
fn test_glob_beside_non_utf8_names() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(OsStr::from_bytes(b"f\xff.txt")), "raw\n").unwrap();
    fs::write(dir.path().join(OsStr::from_bytes(b".\xfe")), "hidden\n").unwrap();
    fs::write(dir.path().join("fine.txt"), "fine\n").unwrap();
    let out = dir.path().join("out.log");

    let status = run(&format!("cat {}/f*.txt > {}", dir.path().display(), out.display()));
    assert_eq!(status, Status::Exited(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "fine\n");
}

#[test]
fn test_background_returns_immediately() {
    let mut sh = shell();
    let started = Instant::now();
    let status = status(sh.execute("sleep 5 &").unwrap());
    assert!(started.elapsed() < Duration::from_secs(1));

    let Status::Background { pid, .. } = status else {
        panic!("expected a background job, got {:?}", status);
    };
    assert_eq!(sh.jobs().len(), 1);

    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(pid as i32),
        nix::sys::signal::Signal::SIGTERM,
    )
    .unwrap();
    let finished = wait_for_job(&mut sh);
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].status, Status::Signaled(15));
}

#[test]
fn test_background_then_foreground() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let mut sh = shell();
    let status = status(
        sh.execute(&format!("sleep 0.2 & echo now > {}", out.display()))
            .unwrap(),
    );
    assert_eq!(status, Status::Exited(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "now\n");
    assert_eq!(wait_for_job(&mut sh).len(), 1);
}

#[test]
fn test_background_input_is_detached() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let mut sh = shell();
    // cat would wait on the terminal forever if it shared the shell's input
    sh.execute(&format!("cat > {} &", out.display())).unwrap();
    let finished = wait_for_job(&mut sh);
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].status, Status::Exited(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "");
}
