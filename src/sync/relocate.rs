use shell_words::quote;
use thiserror::Error;

use crate::remote::{RemoteError, RemoteShell};

/// Why a relocation did not complete.
#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("Command exited with status {exit_code}: {command}")]
    CommandFailed { command: String, exit_code: i32 },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Moves fetched content from its staging path into the final mod directory.
pub struct Relocator<'a, S: ?Sized> {
    shell: &'a S,
}

impl<'a, S: RemoteShell + ?Sized> Relocator<'a, S> {
    pub fn new(shell: &'a S) -> Self {
        Self { shell }
    }

    /// `mkdir -p` the destination, then move every staged entry into it.
    ///
    /// Stops at the first non-zero exit. A destination created before a
    /// failed move is left in place, and since later passes treat an existing
    /// destination as installed, it must be removed by hand to refetch.
    pub fn relocate(
        &self,
        staging_path: &str,
        destination_path: &str,
    ) -> Result<(), RelocateError> {
        let commands = [
            format!("mkdir -p {}", quote(destination_path)),
            format!("mv {}/* {}", quote(staging_path), quote(destination_path)),
        ];

        for command in commands {
            let exit_code = self.shell.execute(&command)?;
            if exit_code != 0 {
                tracing::warn!(command = %command, exit_code, "relocation step failed");
                return Err(RelocateError::CommandFailed { command, exit_code });
            }
        }

        tracing::debug!(from = %staging_path, to = %destination_path, "relocated mod");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeShell;

    #[test]
    fn test_relocate_runs_both_steps() {
        let shell = FakeShell::new();
        Relocator::new(&shell)
            .relocate("/srv/staging/content/107410/222", "/srv/@modb")
            .unwrap();

        assert_eq!(
            shell.commands(),
            [
                "mkdir -p /srv/@modb",
                "mv /srv/staging/content/107410/222/* /srv/@modb"
            ]
        );
        assert!(shell.has_dir("/srv/@modb"));
    }

    #[test]
    fn test_relocate_stops_at_first_failure() {
        let shell = FakeShell::new().with_failure("mkdir", 1);
        let err = Relocator::new(&shell)
            .relocate("/srv/staging/222", "/srv/@modb")
            .unwrap_err();

        match err {
            RelocateError::CommandFailed { command, exit_code } => {
                assert_eq!(command, "mkdir -p /srv/@modb");
                assert_eq!(exit_code, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(shell.commands().len(), 1);
    }

    #[test]
    fn test_relocate_move_failure_leaves_destination() {
        let shell = FakeShell::new().with_failure("mv ", 1);
        let err = Relocator::new(&shell)
            .relocate("/srv/staging/222", "/srv/@modb")
            .unwrap_err();

        assert!(matches!(
            err,
            RelocateError::CommandFailed { exit_code: 1, .. }
        ));
        assert!(shell.has_dir("/srv/@modb"));
    }

    #[test]
    fn test_relocate_quotes_paths() {
        let shell = FakeShell::new();
        Relocator::new(&shell)
            .relocate("/srv/stage dir/222", "/srv/@mod b")
            .unwrap();
        assert_eq!(shell.commands()[1], "mv '/srv/stage dir/222'/* '/srv/@mod b'");
    }

    #[test]
    fn test_relocate_propagates_unavailable() {
        let shell = FakeShell::new().unavailable();
        let err = Relocator::new(&shell)
            .relocate("/srv/staging/222", "/srv/@modb")
            .unwrap_err();
        assert!(matches!(err, RelocateError::Remote(_)));
    }
}
