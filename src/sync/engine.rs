//! The end-to-end sync pass.
//!
//! ```text
//! Probing ──> Planning ──> Fetching ──> Relocating ──> Reporting ──> Done
//!                │                          │
//!                │ (nothing missing)        └──> Fetching (retry round, FetchFailed subset only)
//!                └──────────────────────────────────────> Reporting
//! ```
//!
//! A failed mod never aborts the pass. Only configuration and remote
//! availability errors do.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use serde::Serialize;
use shell_words::quote;

use super::fetch::FetchExecutor;
use super::plan::{FetchPlanner, SyncPlan};
use super::probe::InstallationProbe;
use super::relocate::{RelocateError, Relocator};
use crate::config::{Credentials, ModEntry, SyncConfig};
use crate::error::SyncError;
use crate::remote::RemoteShell;

/// Stage of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Probing,
    Planning,
    Fetching,
    Relocating,
    Reporting,
    Done,
}

/// What happened to a mod that was missing at the start of the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelocationOutcome {
    /// Staged content was moved into the destination.
    Moved,
    /// The staging path never appeared after fetching.
    FetchFailed,
    /// Creating the destination or moving the content failed.
    MoveFailed { command: String, exit_code: i32 },
}

impl RelocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Moved)
    }
}

/// Per-mod line of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ModResult {
    /// Workshop content id.
    pub content_id: String,
    /// Canonical (trimmed, lower-cased) mod name.
    pub name: String,
    /// Final `@name` directory under the mods root.
    pub destination: String,
    /// Destination existed before the pass; nothing was done for this mod.
    pub already_installed: bool,
    /// `None` when nothing was attempted (installed, or a dry run).
    pub outcome: Option<RelocationOutcome>,
    /// Fetch rounds that included this mod.
    pub fetch_attempts: u32,
}

impl ModResult {
    pub fn failed(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| !o.is_success())
    }
}

/// Summary of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// One entry per catalog mod, in catalog order.
    pub results: Vec<ModResult>,
    pub fetch_rounds: u32,
    pub fetch_output_lines: usize,
    /// `@name;@name;...` for the full catalog.
    pub load_order: String,
    pub total_duration_ms: u64,
    pub dry_run: bool,
    /// Redacted fetch command, set on dry runs with something to fetch.
    pub planned_command: Option<String>,
}

impl SyncReport {
    pub fn missing_count(&self) -> usize {
        self.results.iter().filter(|r| !r.already_installed).count()
    }

    pub fn installed_count(&self) -> usize {
        self.results.iter().filter(|r| r.already_installed).count()
    }

    pub fn moved_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == Some(RelocationOutcome::Moved))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.failed()).count()
    }

    /// Every catalog mod is installed, either before or during this pass.
    pub fn all_succeeded(&self) -> bool {
        !self.dry_run
            && self
                .results
                .iter()
                .all(|r| r.already_installed || r.outcome == Some(RelocationOutcome::Moved))
    }
}

/// Progress notifications emitted while a pass runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent<'a> {
    Missing { name: &'a str },
    FetchStarted { count: usize, round: u32 },
    FetchOutput(&'a str),
    Downloaded { name: &'a str },
    DownloadFailed { name: &'a str },
    Moved { name: &'a str },
    MoveFailed { name: &'a str },
}

impl fmt::Display for SyncEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { name } => write!(f, "Missing mod: {name}"),
            Self::FetchStarted { round: 1, .. } => write!(f, "Started downloading mods!"),
            Self::FetchStarted { count, round } => {
                write!(f, "Retrying download of {count} mod(s) (round {round})")
            }
            Self::FetchOutput(line) => write!(f, "{line}"),
            Self::Downloaded { name } => write!(f, "Successfully downloaded mod: {name}"),
            Self::DownloadFailed { name } => write!(f, "Failed to download mod: {name}"),
            Self::Moved { name } => write!(f, "Successfully moved mod: {name}"),
            Self::MoveFailed { name } => write!(f, "Failed to move mod: {name}"),
        }
    }
}

/// Orchestrates probing, fetching and relocation for one catalog.
pub struct SyncEngine<'a, S: ?Sized> {
    shell: &'a S,
    config: &'a SyncConfig,
    credentials: &'a Credentials,
    validate: bool,
    dry_run: bool,
    phase: Phase,
}

impl<'a, S: RemoteShell + ?Sized> SyncEngine<'a, S> {
    pub fn new(shell: &'a S, config: &'a SyncConfig, credentials: &'a Credentials) -> Self {
        Self {
            shell,
            config,
            credentials,
            validate: config.validate,
            dry_run: false,
            phase: Phase::Probing,
        }
    }

    /// Force the `validate` directive on or off.
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Stop after planning: probe only, never fetch or move.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run the pass, reporting progress through `observer`.
    pub fn run(
        &mut self,
        observer: &mut dyn FnMut(&SyncEvent<'_>),
    ) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        let config = self.config;

        self.enter(Phase::Probing);
        let plan = self.probe(observer)?;
        let mut results: Vec<ModResult> = config
            .catalog
            .entries()
            .iter()
            .map(|entry| ModResult {
                content_id: entry.id.clone(),
                name: entry.canonical_name(),
                destination: config.destination_path(entry),
                already_installed: plan.destination(&entry.id).is_none(),
                outcome: None,
                fetch_attempts: 0,
            })
            .collect();
        let index: HashMap<String, usize> = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.content_id.clone(), i))
            .collect();

        self.enter(Phase::Planning);
        let planner = FetchPlanner::new(config, self.credentials);
        let mut fetch_rounds = 0;
        let mut fetch_output_lines = 0;
        let mut planned_command = None;

        if plan.is_empty() {
            tracing::info!(mods = results.len(), "all mods already installed");
        } else if self.dry_run {
            let invocation = planner.build_invocation(plan.missing_ids(), self.validate);
            tracing::info!(missing = plan.len(), "dry run, skipping fetch");
            planned_command = Some(invocation.to_string());
        } else {
            self.prepare_staging_root()?;
            let mut pending = plan.missing_ids().to_vec();

            loop {
                fetch_rounds += 1;
                self.enter(Phase::Fetching);
                observer(&SyncEvent::FetchStarted {
                    count: pending.len(),
                    round: fetch_rounds,
                });
                let invocation = planner.build_invocation(&pending, self.validate);
                fetch_output_lines += FetchExecutor::new(self.shell)
                    .run(&invocation, |line| observer(&SyncEvent::FetchOutput(line)))?
                    .len();

                self.enter(Phase::Relocating);
                let mut fetch_failed = Vec::new();
                for id in &pending {
                    let (Some(&i), Some(destination)) = (index.get(id), plan.destination(id))
                    else {
                        continue;
                    };
                    let Some(entry) = config.catalog.get(id) else {
                        continue;
                    };

                    let outcome = self.relocate_one(entry, destination, observer)?;
                    if outcome == RelocationOutcome::FetchFailed {
                        fetch_failed.push(id.clone());
                    }
                    results[i].fetch_attempts += 1;
                    results[i].outcome = Some(outcome);
                }

                if fetch_failed.is_empty() || fetch_rounds > config.fetch_retries {
                    break;
                }
                tracing::info!(
                    remaining = fetch_failed.len(),
                    round = fetch_rounds + 1,
                    "retrying failed downloads"
                );
                pending = fetch_failed;
            }
        }

        self.enter(Phase::Reporting);
        let report = SyncReport {
            results,
            fetch_rounds,
            fetch_output_lines,
            load_order: config.catalog.load_order(),
            total_duration_ms: start.elapsed().as_millis() as u64,
            dry_run: self.dry_run,
            planned_command,
        };
        tracing::info!(
            installed = report.installed_count(),
            moved = report.moved_count(),
            failed = report.failed_count(),
            duration_ms = report.total_duration_ms,
            "sync pass complete"
        );

        self.enter(Phase::Done);
        Ok(report)
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "sync phase");
        self.phase = phase;
    }

    /// Find every catalog mod whose destination does not exist yet.
    fn probe(&self, observer: &mut dyn FnMut(&SyncEvent<'_>)) -> Result<SyncPlan, SyncError> {
        let probe = InstallationProbe::new(self.shell);
        let mut plan = SyncPlan::new();

        for entry in self.config.catalog.entries() {
            let destination = self.config.destination_path(entry);
            if probe.exists(&destination)? {
                continue;
            }
            tracing::info!(id = %entry.id, name = %entry.name, "mod missing");
            observer(&SyncEvent::Missing { name: &entry.name });
            plan.add(entry.id.clone(), destination);
        }
        Ok(plan)
    }

    fn prepare_staging_root(&self) -> Result<(), SyncError> {
        let root = &self.config.staging_root;
        let exit_code = self.shell.execute(&format!("mkdir -p {}", quote(root)))?;
        if exit_code != 0 {
            tracing::warn!(staging_root = %root, exit_code, "could not create staging root");
        }
        Ok(())
    }

    /// Verify the staged copy exists, then move it into place.
    fn relocate_one(
        &self,
        entry: &ModEntry,
        destination: &str,
        observer: &mut dyn FnMut(&SyncEvent<'_>),
    ) -> Result<RelocationOutcome, SyncError> {
        let staging = self.config.staging_path(&entry.id);

        if !InstallationProbe::new(self.shell).exists(&staging)? {
            tracing::warn!(id = %entry.id, staging = %staging, "staging path missing after fetch");
            observer(&SyncEvent::DownloadFailed { name: &entry.name });
            return Ok(RelocationOutcome::FetchFailed);
        }
        observer(&SyncEvent::Downloaded { name: &entry.name });

        match Relocator::new(self.shell).relocate(&staging, destination) {
            Ok(()) => {
                observer(&SyncEvent::Moved { name: &entry.name });
                Ok(RelocationOutcome::Moved)
            }
            Err(RelocateError::CommandFailed { command, exit_code }) => {
                tracing::warn!(id = %entry.id, command = %command, exit_code, "failed to move mod");
                observer(&SyncEvent::MoveFailed { name: &entry.name });
                Ok(RelocationOutcome::MoveFailed { command, exit_code })
            }
            Err(RelocateError::Remote(e)) => Err(e.into()),
        }
    }
}
