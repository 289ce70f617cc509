//! Missing-set bookkeeping and construction of the batched fetch command.

use std::collections::HashMap;
use std::fmt;

use shell_words::quote;

use crate::config::{Credentials, SyncConfig};

/// Mods found missing during probing, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    missing: Vec<String>,
    destinations: HashMap<String, String>,
}

impl SyncPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a missing mod and where it must end up.
    ///
    /// Re-adding an id only updates its destination.
    pub fn add(&mut self, content_id: impl Into<String>, destination: impl Into<String>) {
        let content_id = content_id.into();
        if self
            .destinations
            .insert(content_id.clone(), destination.into())
            .is_none()
        {
            self.missing.push(content_id);
        }
    }

    pub fn missing_ids(&self) -> &[String] {
        &self.missing
    }

    pub fn destination(&self, content_id: &str) -> Option<&str> {
        self.destinations.get(content_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn len(&self) -> usize {
        self.missing.len()
    }
}

/// One `+directive` of the fetch tool's command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    ForceInstallDir(String),
    Login { username: String, password: String },
    GuardCode(String),
    WorkshopDownload { app_id: u32, content_id: String },
    Validate,
    Quit,
}

impl Directive {
    fn render(&self, redact: bool) -> String {
        match self {
            Self::ForceInstallDir(dir) => format!("+force_install_dir {}", quote(dir)),
            Self::Login { username, .. } if redact => {
                format!("+login {} ********", quote(username))
            }
            Self::Login { username, password } => {
                format!("+login {} {}", quote(username), quote(password))
            }
            Self::GuardCode(_) if redact => "+set_steam_guard_code *****".to_string(),
            Self::GuardCode(code) => format!("+set_steam_guard_code {}", quote(code)),
            Self::WorkshopDownload { app_id, content_id } => {
                format!("+workshop_download_item {} {}", app_id, quote(content_id))
            }
            Self::Validate => "validate".to_string(),
            Self::Quit => "+quit".to_string(),
        }
    }
}

/// A complete fetch tool command: program followed by its directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchInvocation {
    program: String,
    directives: Vec<Directive>,
}

impl FetchInvocation {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Content ids fetched by this invocation, in order.
    pub fn content_ids(&self) -> impl Iterator<Item = &str> {
        self.directives.iter().filter_map(|d| match d {
            Directive::WorkshopDownload { content_id, .. } => Some(content_id.as_str()),
            _ => None,
        })
    }

    /// The exact command string sent to the remote shell.
    pub fn command_line(&self) -> String {
        self.join(false)
    }

    /// Same as [`Self::command_line`] with the password and guard code masked.
    pub fn redacted(&self) -> String {
        self.join(true)
    }

    fn join(&self, redact: bool) -> String {
        std::iter::once(quote(&self.program).into_owned())
            .chain(self.directives.iter().map(|d| d.render(redact)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Displays the redacted form so invocations are safe to log.
impl fmt::Display for FetchInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Builds batched fetch invocations. Pure: no remote calls.
#[derive(Debug, Clone, Copy)]
pub struct FetchPlanner<'a> {
    config: &'a SyncConfig,
    credentials: &'a Credentials,
}

impl<'a> FetchPlanner<'a> {
    pub fn new(config: &'a SyncConfig, credentials: &'a Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// One login, an optional guard code, one download per id in input
    /// order, an optional `validate`, then `+quit`.
    pub fn build_invocation(&self, missing_ids: &[String], validate: bool) -> FetchInvocation {
        let mut directives = Vec::with_capacity(missing_ids.len() + 5);
        directives.push(Directive::ForceInstallDir(self.config.staging_root.clone()));
        directives.push(Directive::Login {
            username: self.credentials.username().to_string(),
            password: self.credentials.password().to_string(),
        });
        if let Some(code) = &self.config.guard_code {
            directives.push(Directive::GuardCode(code.clone()));
        }
        directives.extend(missing_ids.iter().map(|id| Directive::WorkshopDownload {
            app_id: self.config.app_id,
            content_id: id.clone(),
        }));
        if validate {
            directives.push(Directive::Validate);
        }
        directives.push(Directive::Quit);

        FetchInvocation {
            program: self.config.tool_path.clone(),
            directives,
        }
    }
}
