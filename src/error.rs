use thiserror::Error;

use crate::config::ConfigError;
use crate::remote::RemoteError;

/// Errors that abort a whole sync pass.
///
/// Per-mod fetch and move failures are not errors; they are recorded as
/// [`crate::sync::RelocationOutcome`] values in the report.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
