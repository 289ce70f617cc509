//! Workshop mod synchronization.
//!
//! One pass brings the target's mod directories in line with the catalog:
//!
//! - **probe**: which catalog mods already have a destination directory
//! - **plan**: the missing set and the single batched fetch command for it
//! - **fetch**: run that command once, streaming the tool's output
//! - **relocate**: move each fetched mod from staging into place
//! - **engine**: the state machine tying these together and the report
//!
//! # Example
//!
//! ```rust,ignore
//! use workshop_sync::config::{Credentials, SyncConfig};
//! use workshop_sync::remote;
//! use workshop_sync::sync::SyncEngine;
//!
//! let config = SyncConfig::load(&path)?;
//! let credentials = Credentials::load(&config.credentials_file)?;
//! let shell = remote::connect(&config.target)?;
//!
//! let report = SyncEngine::new(&shell, &config, &credentials).run(&mut |event| println!("{event}"))?;
//! println!("{}", report.load_order);
//! ```

pub mod engine;
pub mod fetch;
pub mod plan;
pub mod probe;
pub mod relocate;

pub use engine::{ModResult, Phase, RelocationOutcome, SyncEngine, SyncEvent, SyncReport};
pub use fetch::FetchExecutor;
pub use plan::{Directive, FetchInvocation, FetchPlanner, SyncPlan};
pub use probe::InstallationProbe;
pub use relocate::{RelocateError, Relocator};

#[cfg(test)]
pub(crate) fn test_config(mods: &[(&str, &str)]) -> crate::config::SyncConfig {
    use crate::config::{ModCatalog, ModEntry, SyncConfig, TargetConfig};

    SyncConfig {
        tool_path: "/srv/steamcmd/steamcmd.sh".into(),
        staging_root: "/srv/staging".into(),
        mods_root: "/srv/mods".into(),
        app_id: crate::config::DEFAULT_APP_ID,
        guard_code: None,
        validate: false,
        fetch_retries: 0,
        credentials_file: "credentials.txt".into(),
        target: TargetConfig::Local,
        catalog: ModCatalog::new(
            mods.iter()
                .map(|(id, name)| ModEntry::new(*id, *name))
                .collect(),
        )
        .unwrap(),
    }
}
