//! Process pipeline for pipesh
//!
//! Turns a group of stages into running processes. Adjacent stages are
//! joined by anonymous pipes; redirections replace a stage's channel end
//! with a file. A foreground group is awaited stage by stage and reports
//! the status of its last stage. A background group is handed to the job
//! table and the shell moves on.

use crate::expand;
use crate::jobs::{Finished, JobTable};
use crate::parser::{Group, Stage};
use crate::redirect::{open_input, open_output, RedirectError, Redirections};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, PipeReader, PipeWriter};
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use thiserror::Error;

/// Completion status of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Last stage exited normally
    Exited(i32),
    /// Last stage was killed by a signal
    Signaled(i32),
    /// Last stage could not be started
    SpawnFailed,
    /// Group was launched in the background
    Background { job: usize, pid: u32 },
}

impl Status {
    pub const SUCCESS: Status = Status::Exited(0);

    /// Numeric status in the usual shell convention
    pub fn code(self) -> i32 {
        match self {
            Status::Exited(code) => code,
            Status::Signaled(sig) => 128 + sig,
            Status::SpawnFailed => 127,
            Status::Background { .. } => 0,
        }
    }

    pub fn success(self) -> bool {
        self.code() == 0
    }

    pub fn from_exit(status: ExitStatus) -> Status {
        match (status.code(), status.signal()) {
            (Some(code), _) => Status::Exited(code),
            (None, Some(sig)) => Status::Signaled(sig),
            (None, None) => Status::Exited(-1),
        }
    }
}

#[derive(Error, Debug)]
pub enum StageError {
    #[error("{program}: {}", describe_spawn(.source))]
    Spawn { program: String, source: io::Error },
    #[error(transparent)]
    Redirect(#[from] RedirectError),
    #[error("cannot create pipe: {0}")]
    Channel(#[source] io::Error),
}

fn describe_spawn(e: &io::Error) -> String {
    match e.kind() {
        io::ErrorKind::NotFound => "command not found".to_string(),
        _ => e.to_string(),
    }
}

fn report(e: &StageError) {
    log::debug!("stage failed: {:?}", e);
    eprintln!("pipesh: {}", e);
}

/// Where a stage reads from when it has no `<` redirection
#[derive(Debug)]
enum Input {
    Inherit,
    Null,
    Channel(PipeReader),
}

/// Runs groups of stages and keeps track of the ones left in the background
#[derive(Debug, Default)]
pub struct ProcessPipeline {
    jobs: JobTable,
}

impl ProcessPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Collect background jobs that have finished, without blocking
    pub fn reap(&mut self) -> Vec<Finished> {
        self.jobs.reap()
    }

    /// Run one group and report its status.
    ///
    /// Failures of individual stages are printed and folded into the
    /// status; the remaining stages still run.
    pub fn run(&mut self, group: Group<'_>) -> Status {
        if group.is_empty() {
            return Status::SUCCESS;
        }
        if group.is_background() {
            return self.launch(group);
        }
        match group.stages {
            [stage] => run_each(stage),
            stages => wait_all(spawn_group(stages, false)),
        }
    }

    fn launch(&mut self, group: Group<'_>) -> Status {
        let children: Vec<Child> = spawn_group(group.stages, true)
            .into_iter()
            .flatten()
            .collect();
        if children.is_empty() {
            return Status::SpawnFailed;
        }

        let (job, pid) = self.jobs.launch(group.to_string(), children);
        log::info!("job {} started in the background: {}", job, group);
        eprintln!("[{}] {}", job, pid);
        Status::Background { job, pid }
    }
}

fn command(argv: &[OsString]) -> Command {
    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]);
    command
}

fn spawn(argv: &[OsString], mut command: Command) -> Result<Child, StageError> {
    log::debug!("spawning {:?}", argv);
    command.spawn().map_err(|source| StageError::Spawn {
        program: argv[0].to_string_lossy().into_owned(),
        source,
    })
}

fn share(file: &File, path: &Path) -> Result<File, RedirectError> {
    file.try_clone().map_err(|source| RedirectError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Start one stage of a piped group
fn spawn_stage(
    stage: &Stage,
    input: Input,
    output: Option<PipeWriter>,
) -> Result<Child, StageError> {
    let files = stage.redirections.open()?;
    let argv = expand::splice(&stage.argv);
    let mut cmd = command(&argv);

    match (files.input, input) {
        (Some(file), _) => {
            cmd.stdin(file);
        }
        (None, Input::Channel(reader)) => {
            cmd.stdin(reader);
        }
        (None, Input::Null) => {
            cmd.stdin(Stdio::null());
        }
        (None, Input::Inherit) => {}
    }
    match (files.output, output) {
        (Some(file), _) => {
            cmd.stdout(file);
        }
        (None, Some(writer)) => {
            cmd.stdout(writer);
        }
        (None, None) => {}
    }
    if let Some(file) = files.error {
        cmd.stderr(file);
    }

    spawn(&argv, cmd)
}

/// Start every stage of a group, wiring neighbours together.
///
/// The returned list has one slot per stage; a stage that failed to start
/// leaves `None` and its neighbours see a closed channel.
fn spawn_group(stages: &[Stage], background: bool) -> Vec<Option<Child>> {
    let last = stages.len().saturating_sub(1);
    let mut children = Vec::with_capacity(stages.len());
    let mut upstream = if background {
        Input::Null
    } else {
        Input::Inherit
    };

    for (i, stage) in stages.iter().enumerate() {
        let input = std::mem::replace(&mut upstream, Input::Null);
        let output = if i < last {
            match io::pipe() {
                Ok((reader, writer)) => {
                    log::debug!("channel {} -> {}", i + 1, i + 2);
                    upstream = Input::Channel(reader);
                    Some(writer)
                }
                Err(e) => {
                    report(&StageError::Channel(e));
                    None
                }
            }
        } else {
            None
        };

        // The parent's copies of both channel ends close when the command
        // built here is dropped.
        match spawn_stage(stage, input, output) {
            Ok(child) => children.push(Some(child)),
            Err(e) => {
                report(&e);
                children.push(None);
            }
        }
    }
    children
}

fn wait_child(mut child: Child) -> Status {
    match child.wait() {
        Ok(status) => Status::from_exit(status),
        Err(e) => {
            log::warn!("wait for pid {} failed: {}", child.id(), e);
            Status::Exited(-1)
        }
    }
}

fn wait_all(children: Vec<Option<Child>>) -> Status {
    let mut status = Status::SpawnFailed;
    for child in children {
        status = child.map_or(Status::SpawnFailed, wait_child);
    }
    status
}

/// Start one invocation of a single-stage group
fn spawn_invocation(
    argv: &[OsString],
    redirections: &Redirections,
    output: Option<&File>,
    error: Option<&File>,
) -> Result<Child, StageError> {
    let mut cmd = command(argv);
    if let Some(path) = &redirections.input {
        cmd.stdin(open_input(path)?);
    }
    if let (Some(file), Some(path)) = (output, &redirections.output) {
        cmd.stdout(share(file, path)?);
    }
    if let (Some(file), Some(path)) = (error, &redirections.error) {
        cmd.stderr(share(file, path)?);
    }
    spawn(argv, cmd)
}

/// Run a single foreground stage once per wildcard match, in order.
///
/// Output files are truncated once and shared by every invocation, so the
/// file collects all of their output. The status is the last invocation's.
fn run_each(stage: &Stage) -> Status {
    let redirections = &stage.redirections;
    let opened = redirections
        .output
        .as_deref()
        .map(open_output)
        .transpose()
        .and_then(|output| {
            let error = redirections.error.as_deref().map(open_output).transpose()?;
            Ok((output, error))
        });
    let (output, error) = match opened {
        Ok(files) => files,
        Err(e) => {
            report(&e.into());
            return Status::SpawnFailed;
        }
    };

    let mut status = Status::SUCCESS;
    for argv in expand::invocations(&stage.argv) {
        status = match spawn_invocation(&argv, redirections, output.as_ref(), error.as_ref()) {
            Ok(child) => wait_child(child),
            Err(e) => {
                report(&e);
                Status::SpawnFailed
            }
        };
    }
    status
}
