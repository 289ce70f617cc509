use shell_words::quote;

use crate::remote::{RemoteError, RemoteShell};

/// Directory existence checks on the target.
pub struct InstallationProbe<'a, S: ?Sized> {
    shell: &'a S,
}

impl<'a, S: RemoteShell + ?Sized> InstallationProbe<'a, S> {
    pub fn new(shell: &'a S) -> Self {
        Self { shell }
    }

    /// `test -d <path>`; exit code 0 means present.
    pub fn exists(&self, path: &str) -> Result<bool, RemoteError> {
        let exit_code = self.shell.execute(&format!("test -d {}", quote(path)))?;
        tracing::debug!(path = %path, exit_code, "probed directory");
        Ok(exit_code == 0)
    }
}
