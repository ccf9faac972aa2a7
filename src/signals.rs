//! Signal handling for pipesh
//!
//! The shell must survive the terminal's interrupt, quit and suspend keys
//! and notice when background children exit:
//! - SIGINT, SIGQUIT, SIGTSTP: set the interrupt flag
//! - SIGCHLD: set the child-exit flag
//!
//! Handlers only flip flags. The shell checks them between commands.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGCHLD, SIGINT, SIGQUIT, SIGTSTP};

pub const CAUGHT_NOTICE: &str = "Signal caught, but continuing...";

/// Flags raised by signal handlers and consumed by the shell
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    interrupt: Arc<AtomicBool>,
    child_exited: Arc<AtomicBool>,
    installed: bool,
}

impl Notifications {
    /// Flags that are never raised by a handler; used when running scripts
    /// and in tests
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handlers for an interactive session
    pub fn install() -> io::Result<Self> {
        let mut notifications = Self::new();
        notifications.installed = true;
        for sig in [SIGINT, SIGQUIT, SIGTSTP] {
            signal_hook::flag::register(sig, Arc::clone(&notifications.interrupt))?;
        }
        signal_hook::flag::register(SIGCHLD, Arc::clone(&notifications.child_exited))?;
        log::debug!("signal handlers installed");
        Ok(notifications)
    }

    /// Flags that behave as if handlers were installed but are only ever
    /// raised by hand
    #[cfg(test)]
    pub(crate) fn manual() -> Self {
        Self {
            installed: true,
            ..Self::default()
        }
    }

    /// Check and clear the interrupt flag
    pub fn take_interrupt(&self) -> bool {
        self.interrupt.swap(false, Ordering::SeqCst)
    }

    /// Check and clear the child-exit flag
    pub fn take_child_exited(&self) -> bool {
        self.child_exited.swap(false, Ordering::SeqCst)
    }

    /// Whether background jobs need polling. Without handlers there is no
    /// way to know, so the answer is always yes.
    pub fn should_reap(&self) -> bool {
        !self.installed || self.take_child_exited()
    }

    pub fn raise_interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    pub fn raise_child_exited(&self) {
        self.child_exited.store(true, Ordering::SeqCst);
    }
}
