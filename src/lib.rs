//! pipesh - a small pipeline shell
//!
//! # Overview
//!
//! pipesh reads a line, splits it on whitespace and runs the commands it
//! names. Commands are joined with three operators:
//!
//! ```text
//! cmd1 | cmd2          # pipe cmd1's output into cmd2
//! cmd1 & cmd2          # start cmd1 in the background, then run cmd2
//! cmd1 ; cmd2          # run cmd1, wait, then run cmd2
//! ```
//!
//! Operators only count when they stand alone: `a|b` is one word. There is
//! no quoting.
//!
//! ## Redirection
//!
//! ```text
//! sort < in.txt > out.txt 2> err.txt
//! ```
//!
//! Each redirection binds to the stage it appears in.
//!
//! ## Wildcards
//!
//! Arguments containing `*` or `?` are matched against the filesystem. A
//! lone command runs once per match; inside a pipe the matches are spliced
//! into the argument list. A pattern that matches nothing is passed through
//! unchanged.
//!
//! ## History
//!
//! `history` lists recent lines, `!N` replays line N and `!text` replays the
//! most recent line starting with `text`.
//!
//! # Example
//!
//! ```no_run
//! use pipesh::{Config, Flow, Shell};
//!
//! let mut shell = Shell::new(Config::default_config());
//! match shell.submit("echo hello | tr a-z A-Z").unwrap() {
//!     Flow::Continue(status) => assert!(status.success()),
//!     Flow::Exit(code) => std::process::exit(code),
//! }
//! ```

pub mod config;
pub mod expand;
pub mod history;
pub mod jobs;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod redirect;
pub mod shell;
pub mod signals;

// Re-export commonly used items
pub use config::Config;
pub use history::{HistoryEntry, HistoryStore};
pub use jobs::{Finished, JobTable};
pub use lexer::{lex, Control, Redirect, Token};
pub use parser::{parse, segment, segment_code, Group, Pipeline, SegmentCode, Stage, SyntaxError};
pub use pipeline::{ProcessPipeline, StageError, Status};
pub use redirect::{RedirectError, Redirections, StdioGuard};
pub use shell::{Builtin, Flow, Shell, ShellError};
pub use signals::Notifications;
