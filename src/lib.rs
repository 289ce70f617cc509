pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod remote;
pub mod sync;

pub use error::SyncError;

use config::{Credentials, SyncConfig, TargetConfig};

/// Load credentials, then open the target with `connect`.
///
/// Credentials are validated first so a bad credential file never reaches
/// the remote host.
pub fn connect_with_credentials<S>(
    config: &SyncConfig,
    connect: impl FnOnce(&TargetConfig) -> Result<S, SyncError>,
) -> Result<(Credentials, S), SyncError> {
    let credentials = Credentials::load(&config.credentials_file)?;
    let shell = connect(&config.target)?;
    Ok((credentials, shell))
}
