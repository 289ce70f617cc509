//! Remote command execution.
//!
//! The sync pass only ever talks to the game server through [`RemoteShell`]:
//! run a command string, get an exit code back, or stream its output line by
//! line. Backends wrap an external client binary:
//!
//! - **docker**: `docker exec <container> sh -c <command>`
//! - **ssh**: `ssh <host> <command>` with batch-mode options
//! - **local**: `sh -c <command>` on this machine
//!
//! No retries or timeouts happen at this layer. A hung remote process blocks
//! the caller until it exits.

pub mod docker;
#[cfg(test)]
pub(crate) mod fake;
pub mod process;

use thiserror::Error;

use crate::config::TargetConfig;
use crate::error::SyncError;

pub use process::ProcessShell;

/// Lazily decoded output lines of a streaming command.
///
/// The underlying process is reaped once the iterator is exhausted.
pub type OutputLines<'a> = Box<dyn Iterator<Item = String> + 'a>;

/// Errors from the remote execution boundary.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote target unavailable: {0}")]
    Unavailable(String),
}

/// Run commands on the execution target.
pub trait RemoteShell {
    /// Run a command to completion and return its exit code.
    fn execute(&self, command: &str) -> Result<i32, RemoteError>;

    /// Run a command and stream its combined output, one line at a time.
    fn execute_streaming(&self, command: &str) -> Result<OutputLines<'_>, RemoteError>;
}

impl<S: RemoteShell + ?Sized> RemoteShell for &S {
    fn execute(&self, command: &str) -> Result<i32, RemoteError> {
        (**self).execute(command)
    }

    fn execute_streaming(&self, command: &str) -> Result<OutputLines<'_>, RemoteError> {
        (**self).execute_streaming(command)
    }
}

impl<S: RemoteShell + ?Sized> RemoteShell for Box<S> {
    fn execute(&self, command: &str) -> Result<i32, RemoteError> {
        (**self).execute(command)
    }

    fn execute_streaming(&self, command: &str) -> Result<OutputLines<'_>, RemoteError> {
        (**self).execute_streaming(command)
    }
}

/// Open a shell for the configured target.
///
/// Docker targets are resolved against the running containers here, so an
/// unknown container fails before any command runs.
pub fn connect(target: &TargetConfig) -> Result<Box<dyn RemoteShell>, SyncError> {
    let shell = match target {
        TargetConfig::Docker { container } => docker::connect(container)?,
        TargetConfig::Ssh {
            host,
            connect_timeout,
        } => ProcessShell::ssh(host, *connect_timeout)?,
        TargetConfig::Local => ProcessShell::local()?,
    };
    tracing::info!(target = %target, "connected to remote target");
    Ok(Box::new(shell))
}
