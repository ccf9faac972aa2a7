//! The pipesh engine
//!
//! `Shell` owns everything one session needs: history, background jobs,
//! the prompt and the signal flags. Front ends hand it lines with
//! `submit` and act on the returned `Flow`.

use crate::config::Config;
use crate::history::HistoryStore;
use crate::jobs::{Finished, JobTable};
use crate::parser::{parse, Group, Stage, SyntaxError};
use crate::pipeline::{ProcessPipeline, Status};
use crate::redirect::{RedirectError, StdioGuard};
use crate::signals::{Notifications, CAUGHT_NOTICE};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Redirect(#[from] RedirectError),
    #[error("!{0}: event not found")]
    HistoryMiss(String),
    #[error("{0}")]
    Builtin(String),
}

/// What the front end should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue(Status),
    Exit(i32),
}

/// Commands the shell runs itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Pwd,
    Prompt,
    History,
    Jobs,
    Exit,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "cd" => Some(Builtin::Cd),
            "pwd" => Some(Builtin::Pwd),
            "prompt" => Some(Builtin::Prompt),
            "history" => Some(Builtin::History),
            "jobs" => Some(Builtin::Jobs),
            "exit" => Some(Builtin::Exit),
            _ => None,
        }
    }
}

pub struct Shell {
    config: Config,
    prompt: String,
    history: HistoryStore,
    pipeline: ProcessPipeline,
    notifications: Notifications,
    last_status: Status,
}

impl Shell {
    /// Create a shell from configuration, loading saved history if a
    /// history file is configured
    pub fn new(config: Config) -> Self {
        let mut history = HistoryStore::new(config.shell.history_capacity);
        if let Some(path) = config.history_path() {
            if let Err(e) = history.load(&path) {
                log::warn!("cannot load history from {}: {}", path.display(), e);
            }
        }

        Shell {
            prompt: config.shell.prompt.clone(),
            config,
            history,
            pipeline: ProcessPipeline::new(),
            notifications: Notifications::new(),
            last_status: Status::SUCCESS,
        }
    }

    /// Use flags raised by installed signal handlers
    pub fn with_notifications(mut self, notifications: Notifications) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn jobs(&self) -> &JobTable {
        self.pipeline.jobs()
    }

    pub fn last_status(&self) -> Status {
        self.last_status
    }

    /// Handle a line typed by the user.
    ///
    /// `!N`, `!prefix` and a bare `!` replay history; anything else is
    /// recorded and executed.
    pub fn submit(&mut self, line: &str) -> Result<Flow, ShellError> {
        if let Some(event) = line.trim().strip_prefix('!') {
            return if !event.is_empty() && event.bytes().all(|b| b.is_ascii_digit()) {
                match event.parse() {
                    Ok(index) => self.replay_index(index),
                    Err(_) => Err(ShellError::HistoryMiss(event.to_string())),
                }
            } else {
                self.replay_prefix(event)
            };
        }

        self.history.record(line);
        self.execute(line)
    }

    /// Replay the history entry numbered `index`
    pub fn replay_index(&mut self, index: usize) -> Result<Flow, ShellError> {
        let line = self
            .history
            .by_index(index)
            .ok_or_else(|| ShellError::HistoryMiss(index.to_string()))?
            .to_string();
        self.replay(&line)
    }

    /// Replay the most recent history entry starting with `prefix`
    pub fn replay_prefix(&mut self, prefix: &str) -> Result<Flow, ShellError> {
        let line = self
            .history
            .by_prefix(prefix)
            .ok_or_else(|| ShellError::HistoryMiss(prefix.to_string()))?
            .to_string();
        self.replay(&line)
    }

    fn replay(&mut self, line: &str) -> Result<Flow, ShellError> {
        log::info!("replaying: {}", line);
        println!("{}", line);
        self.execute(line)
    }

    /// Run a line without recording it.
    ///
    /// The status of a line is the status of its last group. A blank line
    /// leaves the previous status in place.
    pub fn execute(&mut self, line: &str) -> Result<Flow, ShellError> {
        let pipeline = parse(line)?;
        if pipeline.is_empty() {
            return Ok(Flow::Continue(self.last_status));
        }
        log::debug!("{} stage(s): {}", pipeline.len(), line.trim());

        for group in pipeline.groups() {
            match self.run_group(group) {
                Flow::Continue(status) => self.last_status = status,
                exit @ Flow::Exit(_) => return Ok(exit),
            }
        }
        Ok(Flow::Continue(self.last_status))
    }

    fn run_group(&mut self, group: Group<'_>) -> Flow {
        if let [stage] = group.stages {
            if !group.is_background() {
                if let Some(builtin) = Builtin::from_name(stage.program()) {
                    return self.run_builtin(builtin, stage);
                }
            }
        }

        // Only interrupts that arrive while the group runs are reported
        self.notifications.take_interrupt();
        let status = self.pipeline.run(group);
        if !group.is_background() && self.notifications.take_interrupt() {
            eprintln!("{}", CAUGHT_NOTICE);
        }
        Flow::Continue(status)
    }

    /// Run a builtin with its redirections applied to the shell's own
    /// standard streams. Errors are printed before the streams are restored,
    /// so `2>` captures them.
    fn run_builtin(&mut self, builtin: Builtin, stage: &Stage) -> Flow {
        let _guard = match StdioGuard::apply(&stage.redirections) {
            Ok(guard) => guard,
            Err(e) => return builtin_failed(e.into()),
        };
        let args = stage.args();
        log::debug!("builtin {:?} {:?}", builtin, args);

        self.builtin(builtin, args).unwrap_or_else(builtin_failed)
    }

    fn builtin(&mut self, builtin: Builtin, args: &[String]) -> Result<Flow, ShellError> {
        match builtin {
            Builtin::Cd => self.builtin_cd(args)?,
            Builtin::Pwd => println!("{}", std::env::current_dir()?.display()),
            Builtin::Prompt => self.builtin_prompt(args),
            Builtin::History => {
                for entry in self.history.entries() {
                    println!("{}: {}", entry.index, entry.line);
                }
            }
            Builtin::Jobs => self.builtin_jobs(),
            Builtin::Exit => return self.builtin_exit(args),
        }
        Ok(Flow::Continue(Status::SUCCESS))
    }

    fn builtin_cd(&mut self, args: &[String]) -> Result<(), ShellError> {
        let dir = match args.first() {
            Some(arg) => PathBuf::from(shellexpand::tilde(arg).into_owned()),
            None => std::env::var_os("HOME")
                .map(PathBuf::from)
                .ok_or_else(|| ShellError::Builtin("cd: HOME not set".into()))?,
        };

        // Also changes the directory children inherit
        std::env::set_current_dir(&dir)
            .map_err(|e| ShellError::Builtin(format!("cd: {}: {}", dir.display(), e)))
    }

    fn builtin_prompt(&mut self, args: &[String]) {
        self.prompt = if args.is_empty() {
            self.config.shell.prompt.clone()
        } else {
            format!("{} ", args.join(" "))
        };
    }

    fn builtin_jobs(&mut self) {
        for finished in self.pipeline.reap() {
            println!("{}", finished);
        }
        for job in self.pipeline.jobs().running() {
            println!("[{}] {}  Running  {}", job.id, job.pid, job.command);
        }
    }

    fn builtin_exit(&mut self, args: &[String]) -> Result<Flow, ShellError> {
        let code = match args.first() {
            None => self.last_status.code(),
            Some(arg) => arg.parse().map_err(|_| {
                ShellError::Builtin(format!("exit: {}: numeric argument required", arg))
            })?,
        };
        Ok(Flow::Exit(code))
    }

    /// Collect background jobs that have finished since the last call
    pub fn reap_finished(&mut self) -> Vec<Finished> {
        if self.pipeline.jobs().is_empty() || !self.notifications.should_reap() {
            return Vec::new();
        }
        self.pipeline.reap()
    }

    /// Print finished jobs if the configuration asks for it
    pub fn notify_finished(&mut self) {
        let finished = self.reap_finished();
        if self.config.shell.notify_jobs {
            for job in finished {
                eprintln!("{}", job);
            }
        }
    }

    /// Write history back to the configured file, if any
    pub fn save_history(&self) -> io::Result<()> {
        match self.config.history_path() {
            Some(path) => self.history.save(&path),
            None => Ok(()),
        }
    }
}

fn builtin_failed(e: ShellError) -> Flow {
    eprintln!("pipesh: {}", e);
    Flow::Continue(Status::Exited(1))
}
