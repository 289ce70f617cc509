use std::time::Instant;

use super::plan::FetchInvocation;
use crate::remote::{RemoteError, RemoteShell};

/// Runs a fetch invocation and collects its output.
///
/// The output is only surfaced and recorded. Which mods actually arrived is
/// decided afterwards by probing staging paths, since the tool's log lines
/// are not a reliable success signal.
pub struct FetchExecutor<'a, S: ?Sized> {
    shell: &'a S,
}

impl<'a, S: RemoteShell + ?Sized> FetchExecutor<'a, S> {
    pub fn new(shell: &'a S) -> Self {
        Self { shell }
    }

    /// Block until the tool exits, handing each non-empty line to `on_line`.
    pub fn run(
        &self,
        invocation: &FetchInvocation,
        mut on_line: impl FnMut(&str),
    ) -> Result<Vec<String>, RemoteError> {
        let start = Instant::now();
        tracing::info!(
            command = %invocation,
            mods = invocation.content_ids().count(),
            "starting fetch"
        );

        let mut lines = Vec::new();
        for line in self.shell.execute_streaming(&invocation.command_line())? {
            if line.is_empty() {
                continue;
            }
            tracing::info!(target: "workshop_sync::fetch", "{line}");
            on_line(&line);
            lines.push(line);
        }

        tracing::info!(
            lines = lines.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "fetch finished"
        );
        Ok(lines)
    }
}
