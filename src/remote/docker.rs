//! Docker container targets.

use std::process::Command;

use super::{ProcessShell, RemoteError};
use crate::config::ConfigError;
use crate::error::SyncError;

/// Resolve `container` among the running containers and build a shell for it.
///
/// A missing `docker` binary or an unreachable daemon is [`RemoteError`]; a
/// container that is not running is a configuration error.
pub fn connect(container: &str) -> Result<ProcessShell, SyncError> {
    let docker = which::which("docker")
        .map_err(|e| RemoteError::Unavailable(format!("docker not found on PATH: {e}")))?;

    let output = Command::new(&docker)
        .args(["ps", "--no-trunc", "--format", "{{.ID}} {{.Names}}"])
        .output()
        .map_err(|e| RemoteError::Unavailable(format!("Failed to execute docker: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RemoteError::Unavailable(format!(
            "Failed to list containers: {}",
            stderr.trim()
        ))
        .into());
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    let id = resolve_container_id(&listing, container)?;
    tracing::debug!(container = %container, id = %id, "resolved container");
    Ok(ProcessShell::docker(docker, &id))
}

/// Find the full id for `wanted` in `docker ps` output of `<id> <names>` lines.
///
/// Matches an exact container name first, then a unique id prefix (the short
/// id shown by `docker ps`).
pub fn resolve_container_id(listing: &str, wanted: &str) -> Result<String, ConfigError> {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return Err(ConfigError::TargetNotFound(wanted.to_string()));
    }

    let containers: Vec<(&str, Vec<&str>)> = listing
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let id = parts.next()?;
            let names: Vec<&str> = parts
                .next()
                .map(|n| n.split(',').collect())
                .unwrap_or_default();
            Some((id, names))
        })
        .collect();

    if let Some((id, _)) = containers.iter().find(|(_, names)| names.contains(&wanted)) {
        return Ok(id.to_string());
    }

    let mut matches = containers.iter().filter(|(id, _)| id.starts_with(wanted));
    match (matches.next(), matches.next()) {
        (Some((id, _)), None) => Ok(id.to_string()),
        (Some(_), Some(_)) => Err(ConfigError::AmbiguousTarget(wanted.to_string())),
        (None, _) => Err(ConfigError::TargetNotFound(wanted.to_string())),
    }
}
