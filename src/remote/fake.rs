//! Scripted in-memory shell for unit tests.
//!
//! Understands the handful of commands the sync pass issues: `test -d`,
//! `mkdir -p`, `mv` and the streamed fetch. Directories "exist" when seeded,
//! created by `mkdir -p`, or populated by a fetch.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::{OutputLines, RemoteError, RemoteShell};

#[derive(Default)]
pub struct FakeShell {
    dirs: RefCell<HashSet<String>>,
    /// Directories that appear whenever a fetch runs.
    fetch_creates: Vec<String>,
    /// Forced exit codes for commands starting with a prefix.
    failures: HashMap<String, i32>,
    fetch_output: Vec<String>,
    unavailable: bool,
    commands: RefCell<Vec<String>>,
    streamed: RefCell<Vec<String>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dir(self, path: impl Into<String>) -> Self {
        self.dirs.borrow_mut().insert(path.into());
        self
    }

    #[must_use]
    pub fn with_fetch_creating(mut self, path: impl Into<String>) -> Self {
        self.fetch_creates.push(path.into());
        self
    }

    #[must_use]
    pub fn with_failure(mut self, prefix: impl Into<String>, code: i32) -> Self {
        self.failures.insert(prefix.into(), code);
        self
    }

    #[must_use]
    pub fn with_fetch_output(mut self, lines: &[&str]) -> Self {
        self.fetch_output = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Every command passed to `execute`, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    /// Every command passed to `execute_streaming`, in order.
    pub fn streamed(&self) -> Vec<String> {
        self.streamed.borrow().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.commands.borrow().len() + self.streamed.borrow().len()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.dirs.borrow().contains(path)
    }

    fn forced_code(&self, command: &str) -> Option<i32> {
        self.failures
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, code)| *code)
    }
}

impl RemoteShell for FakeShell {
    fn execute(&self, command: &str) -> Result<i32, RemoteError> {
        self.commands.borrow_mut().push(command.to_string());
        if self.unavailable {
            return Err(RemoteError::Unavailable("fake target is down".into()));
        }
        if let Some(code) = self.forced_code(command) {
            return Ok(code);
        }

        let words = shell_words::split(command).unwrap_or_default();
        let code = match words.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["test", "-d", path] => {
                if self.has_dir(path) {
                    0
                } else {
                    1
                }
            }
            ["mkdir", "-p", path] => {
                self.dirs.borrow_mut().insert(path.to_string());
                0
            }
            _ => 0,
        };
        Ok(code)
    }

    fn execute_streaming(&self, command: &str) -> Result<OutputLines<'_>, RemoteError> {
        self.streamed.borrow_mut().push(command.to_string());
        if self.unavailable {
            return Err(RemoteError::Unavailable("fake target is down".into()));
        }
        self.dirs
            .borrow_mut()
            .extend(self.fetch_creates.iter().cloned());
        Ok(Box::new(self.fetch_output.clone().into_iter()))
    }
}
