//! [`RemoteShell`] backed by an external client process.
//!
//! Every backend boils down to a fixed argv prefix with the command string
//! appended as the final argument, so one implementation serves docker, ssh
//! and the local shell.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};

use super::{OutputLines, RemoteError, RemoteShell};

/// Exit status `ssh` itself uses for connection failures.
const SSH_CONNECTION_FAILED: i32 = 255;

/// Runs commands through `<program> <args...> <command>`.
#[derive(Debug, Clone)]
pub struct ProcessShell {
    program: PathBuf,
    args: Vec<String>,
    /// Exit code the client reserves for "could not reach the target".
    unreachable_code: Option<i32>,
    /// Args for `<program>` that print `true` while the target is up. Run
    /// after any non-zero exit, since the client may not tell a failed
    /// command apart from a vanished target.
    liveness_args: Option<Vec<String>>,
}

impl ProcessShell {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            unreachable_code: None,
            liveness_args: None,
        }
    }

    /// `docker exec <container_id> sh -c <command>`.
    ///
    /// `docker exec` exits non-zero both when the command fails and when the
    /// container or daemon is gone, so non-zero exits are followed by a
    /// `docker inspect` of the container's running state.
    pub fn docker(docker: impl Into<PathBuf>, container_id: &str) -> Self {
        let mut shell = Self::new(
            docker,
            vec![
                "exec".into(),
                container_id.into(),
                "sh".into(),
                "-c".into(),
            ],
        );
        shell.liveness_args = Some(vec![
            "inspect".into(),
            "--format".into(),
            "{{.State.Running}}".into(),
            container_id.into(),
        ]);
        shell
    }

    /// `ssh -o BatchMode=yes ... -- <host> <command>`.
    pub fn ssh(host: &str, connect_timeout: u64) -> Result<Self, RemoteError> {
        let ssh = which::which("ssh")
            .map_err(|e| RemoteError::Unavailable(format!("ssh not found on PATH: {e}")))?;
        let ssh_opts = format!(
            "-o BatchMode=yes -o ConnectTimeout={} -o StrictHostKeyChecking=accept-new",
            connect_timeout
        );
        let mut args: Vec<String> = ssh_opts.split_whitespace().map(String::from).collect();
        args.push("--".into());
        args.push(host.into());

        let mut shell = Self::new(ssh, args);
        shell.unreachable_code = Some(SSH_CONNECTION_FAILED);
        Ok(shell)
    }

    /// `sh -c <command>` on this machine.
    pub fn local() -> Result<Self, RemoteError> {
        let sh = which::which("sh")
            .map_err(|e| RemoteError::Unavailable(format!("sh not found on PATH: {e}")))?;
        Ok(Self::new(sh, vec!["-c".into()]))
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(command).stdin(Stdio::null());
        cmd
    }

    /// `Err` when a liveness check is configured and says the target is down.
    fn ensure_alive(&self) -> Result<(), RemoteError> {
        let Some(args) = &self.liveness_args else {
            return Ok(());
        };
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_failed(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() && stdout.trim() == "true" {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(stderr = %stderr.trim(), "target failed liveness check");
        Err(RemoteError::Unavailable(format!(
            "Target is no longer running: {}",
            if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() }
        )))
    }

    fn spawn_failed(&self, e: std::io::Error) -> RemoteError {
        RemoteError::Unavailable(format!(
            "Failed to execute {}: {}",
            self.program.display(),
            e
        ))
    }
}

impl RemoteShell for ProcessShell {
    fn execute(&self, command: &str) -> Result<i32, RemoteError> {
        tracing::debug!(command = %command, "executing remote command");

        let output = self
            .command(command)
            .output()
            .map_err(|e| self.spawn_failed(e))?;

        // Killed by a signal: report as a generic failure.
        let code = output.status.code().unwrap_or(-1);
        if self.unreachable_code == Some(code) {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemoteError::Unavailable(stderr.trim().to_string()));
        }
        if code != 0 {
            self.ensure_alive()?;
        }

        tracing::trace!(
            exit_code = code,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "remote command finished"
        );
        Ok(code)
    }

    fn execute_streaming(&self, command: &str) -> Result<OutputLines<'_>, RemoteError> {
        // Merge stderr so the tool's whole log arrives on one stream.
        let wrapped = format!("{{ {command}; }} 2>&1");
        let mut child = self
            .command(&wrapped)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_failed(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RemoteError::Unavailable("child stdout was not captured".into()))?;

        Ok(Box::new(ChildLines {
            child,
            reader: Some(BufReader::new(stdout)),
        }))
    }
}

/// Line iterator over a running child; waits on the child once output ends.
struct ChildLines {
    child: Child,
    reader: Option<BufReader<ChildStdout>>,
}

impl ChildLines {
    fn finish(&mut self) {
        self.reader = None;
        match self.child.wait() {
            Ok(status) => tracing::debug!(exit_code = ?status.code(), "streaming command exited"),
            Err(e) => tracing::warn!(error = %e, "failed to wait on streaming command"),
        }
    }
}

impl Iterator for ChildLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.finish();
                None
            }
            Ok(_) => Some(
                String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string(),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read command output");
                self.finish();
                None
            }
        }
    }
}

impl Drop for ChildLines {
    fn drop(&mut self) {
        if self.reader.is_some() {
            self.finish();
        }
    }
}
