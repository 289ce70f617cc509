//! Configuration for a sync pass.
//!
//! Everything a pass needs is read once at startup and then treated as
//! immutable: the remote target, the fetch tool location, the staging and
//! destination roots, and the ordered mod catalog.
//!
//! # Configuration file
//!
//! ```toml
//! tool_path = "/home/container/steamcmd/steamcmd.sh"
//! staging_root = "/home/container/TEMP_DOWNLOAD"
//! mods_root = "/home/container"
//! credentials_file = "credentials.txt"
//!
//! [target]
//! kind = "docker"
//! container = "3f2a9c1b7d4e"
//!
//! [[mods]]
//! id = "450814997"
//! name = "cba_a3"
//! ```
//!
//! Catalog order is significant: it is the order of the load-order string.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workshop application id the catalog items belong to.
pub const DEFAULT_APP_ID: u32 = 107410;

/// Environment variable consulted for the config path when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "WORKSHOP_SYNC_CONFIG";

/// Errors raised while loading configuration or credentials.
///
/// All of these are fatal and surface before any remote call is made.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No config file found; pass --config or set WORKSHOP_SYNC_CONFIG")]
    NotFound,

    #[error("Mod catalog is empty")]
    EmptyCatalog,

    #[error("Duplicate content id in catalog: {0}")]
    DuplicateId(String),

    #[error("Duplicate mod name in catalog: {0}")]
    DuplicateName(String),

    #[error("Invalid content id '{0}': expected decimal digits")]
    InvalidId(String),

    #[error("Invalid mod name '{0}': must be non-empty without '/', ';' or whitespace")]
    InvalidName(String),

    #[error("Expected 2 credential lines (username, password), found {0}")]
    CredentialCount(usize),

    #[error("Credential line {0} is empty")]
    EmptyCredential(usize),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Target '{0}' matches more than one container")]
    AmbiguousTarget(String),
}

// =============================================================================
// Catalog
// =============================================================================

/// One workshop item in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModEntry {
    /// Workshop content id.
    pub id: String,
    /// Display name as configured; see [`ModEntry::canonical_name`].
    pub name: String,
}

impl ModEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Lower-cased name used for the destination directory and load-order token.
    pub fn canonical_name(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

/// Ordered mapping of content id to mod name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModCatalog {
    entries: Vec<ModEntry>,
}

impl ModCatalog {
    /// Build a catalog, rejecting empty, duplicate or malformed entries.
    pub fn new(entries: Vec<ModEntry>) -> Result<Self, ConfigError> {
        let catalog = Self { entries };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn entries(&self) -> &[ModEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ModEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// `@name` tokens joined by `;`, in catalog order.
    ///
    /// Always describes the full catalog, independent of what a pass installed.
    pub fn load_order(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("@{}", e.canonical_name()))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for entry in &self.entries {
            if entry.id.is_empty() || !entry.id.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ConfigError::InvalidId(entry.id.clone()));
            }
            let name = entry.canonical_name();
            if name.is_empty() || name.contains(['/', ';']) || name.contains(char::is_whitespace)
            {
                return Err(ConfigError::InvalidName(entry.name.clone()));
            }
            if !ids.insert(entry.id.as_str()) {
                return Err(ConfigError::DuplicateId(entry.id.clone()));
            }
            if !names.insert(name) {
                return Err(ConfigError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Target
// =============================================================================

/// Where remote commands run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetConfig {
    /// `docker exec` into a running container, matched by id prefix or name.
    Docker { container: String },
    /// Run commands on a host over SSH.
    Ssh {
        host: String,
        #[serde(default = "default_connect_timeout")]
        connect_timeout: u64,
    },
    /// Run commands with the local `sh`.
    Local,
}

impl fmt::Display for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker { container } => write!(f, "docker:{container}"),
            Self::Ssh { host, .. } => write!(f, "ssh:{host}"),
            Self::Local => write!(f, "local"),
        }
    }
}

// =============================================================================
// SyncConfig
// =============================================================================

/// Immutable settings for one pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Fetch tool executable on the target.
    #[serde(default = "default_tool_path")]
    pub tool_path: String,
    /// Directory the fetch tool installs into.
    #[serde(default = "default_staging_root")]
    pub staging_root: String,
    /// Parent of the final `@name` mod directories.
    #[serde(default = "default_mods_root")]
    pub mods_root: String,
    #[serde(default = "default_app_id")]
    pub app_id: u32,
    /// Steam Guard code; omitted from the invocation when unset or blank.
    #[serde(default)]
    pub guard_code: Option<String>,
    /// Append the `validate` directive to every fetch.
    #[serde(default)]
    pub validate: bool,
    /// Extra fetch rounds for mods whose staging path never appeared.
    #[serde(default)]
    pub fetch_retries: u32,
    /// Two-line credential file; relative paths resolve against the config file.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    pub target: TargetConfig,
    #[serde(rename = "mods")]
    pub catalog: ModCatalog,
}

fn default_tool_path() -> String {
    "/home/container/steamcmd/steamcmd.sh".into()
}

fn default_staging_root() -> String {
    "/home/container/TEMP_DOWNLOAD".into()
}

fn default_mods_root() -> String {
    "/home/container".into()
}

fn default_app_id() -> u32 {
    DEFAULT_APP_ID
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("credentials.txt")
}

fn default_connect_timeout() -> u64 {
    10
}

impl SyncConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: SyncConfig = toml::from_str(content)?;
        config.catalog.validate()?;
        config.guard_code = config
            .guard_code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(config)
    }

    /// Load a config file, resolving `credentials_file` relative to it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if config.credentials_file.is_relative()
            && let Some(parent) = path.parent()
        {
            config.credentials_file = parent.join(&config.credentials_file);
        }
        tracing::debug!(
            path = %path.display(),
            mods = config.catalog.len(),
            target = %config.target,
            "loaded config"
        );
        Ok(config)
    }

    /// Platform config location, e.g. `~/.config/workshop-sync/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "workshop-sync")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Final destination of a mod: `<mods_root>/@<canonical name>`.
    pub fn destination_path(&self, entry: &ModEntry) -> String {
        format!(
            "{}/@{}",
            self.mods_root.trim_end_matches('/'),
            entry.canonical_name()
        )
    }

    /// Where the fetch tool deposits a content id.
    pub fn staging_path(&self, content_id: &str) -> String {
        format!(
            "{}/steamapps/workshop/content/{}/{}",
            self.staging_root.trim_end_matches('/'),
            self.app_id,
            content_id
        )
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Account used by the fetch tool. Held in memory for one run only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse a two-line source: username, then password.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let lines: Vec<&str> = content.lines().map(str::trim).collect();
        if lines.len() != 2 {
            return Err(ConfigError::CredentialCount(lines.len()));
        }
        if let Some(idx) = lines.iter().position(|l| l.is_empty()) {
            return Err(ConfigError::EmptyCredential(idx + 1));
        }
        Ok(Self::new(lines[0], lines[1]))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}
