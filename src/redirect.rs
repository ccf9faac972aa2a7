//! Redirection for pipesh
//!
//! `resolve` pulls `< path`, `> path` and `2> path` out of a stage's tokens.
//! The files are only opened when the stage runs: either handed to a child
//! process as its standard streams, or swapped into the shell's own
//! descriptors by a `StdioGuard` for builtins.

use crate::lexer::{Redirect, Token};
use nix::unistd;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedirectError {
    #[error("{}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("cannot duplicate descriptor: {0}")]
    Dup(#[from] nix::Error),
}

/// Files a stage's standard streams are bound to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirections {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub error: Option<PathBuf>,
}

impl Redirections {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none() && self.error.is_none()
    }

    fn set(&mut self, kind: Redirect, target: &str) {
        let slot = match kind {
            Redirect::Input => &mut self.input,
            Redirect::Output => &mut self.output,
            Redirect::Error => &mut self.error,
        };
        *slot = Some(PathBuf::from(target));
    }

    /// Open every redirection target. Output files are truncated.
    pub fn open(&self) -> Result<OpenRedirections, RedirectError> {
        Ok(OpenRedirections {
            input: self.input.as_deref().map(open_input).transpose()?,
            output: self.output.as_deref().map(open_output).transpose()?,
            error: self.error.as_deref().map(open_output).transpose()?,
        })
    }
}

impl fmt::Display for Redirections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            (Redirect::Input, &self.input),
            (Redirect::Output, &self.output),
            (Redirect::Error, &self.error),
        ];
        let mut first = true;
        for (kind, path) in parts {
            if let Some(path) = path {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{} {}", kind.as_str(), path.display())?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Opened redirection targets, ready to hand to a process
#[derive(Debug, Default)]
pub struct OpenRedirections {
    pub input: Option<File>,
    pub output: Option<File>,
    pub error: Option<File>,
}

pub fn open_input(path: &Path) -> Result<File, RedirectError> {
    File::open(path).map_err(|source| RedirectError::Open {
        path: path.to_path_buf(),
        source,
    })
}

pub fn open_output(path: &Path) -> Result<File, RedirectError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
        .map_err(|source| RedirectError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Split a stage's tokens into its argument list and its redirections.
///
/// The token right after an operator is its target, whatever it is. A later
/// redirection of the same stream replaces an earlier one, and an operator
/// with nothing after it is ignored.
pub fn resolve(tokens: &[Token]) -> (Vec<String>, Redirections) {
    let mut argv = Vec::with_capacity(tokens.len());
    let mut redirections = Redirections::default();
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        match token {
            Token::Redirect(kind) => {
                if let Some(target) = iter.next() {
                    redirections.set(*kind, target.as_str());
                }
            }
            other => argv.push(other.as_str().to_string()),
        }
    }

    argv.shrink_to_fit();
    (argv, redirections)
}

fn flush_std() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

/// Rebinds the shell's own standard streams for the guard's lifetime.
///
/// Dropping the guard restores the original descriptors, on every path out
/// of the code that created it.
#[derive(Debug)]
pub struct StdioGuard {
    saved: Vec<(RawFd, RawFd)>,
}

impl StdioGuard {
    pub fn apply(redirections: &Redirections) -> Result<StdioGuard, RedirectError> {
        let files = redirections.open()?;
        let mut guard = StdioGuard { saved: Vec::new() };
        flush_std();

        if let Some(file) = files.input {
            guard.replace(libc::STDIN_FILENO, &file)?;
        }
        if let Some(file) = files.output {
            guard.replace(libc::STDOUT_FILENO, &file)?;
        }
        if let Some(file) = files.error {
            guard.replace(libc::STDERR_FILENO, &file)?;
        }
        Ok(guard)
    }

    fn replace(&mut self, target: RawFd, file: &File) -> Result<(), RedirectError> {
        let saved = unistd::dup(target)?;
        self.saved.push((target, saved));
        unistd::dup2(file.as_raw_fd(), target)?;
        Ok(())
    }
}

impl Drop for StdioGuard {
    fn drop(&mut self) {
        flush_std();
        for (target, saved) in self.saved.drain(..).rev() {
            if let Err(e) = unistd::dup2(saved, target) {
                log::warn!("failed to restore descriptor {}: {}", target, e);
            }
            let _ = unistd::close(saved);
        }
    }
}
