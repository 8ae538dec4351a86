pub mod command;
pub mod dispatch;
pub mod state;

use std::fmt;

use crate::util::command::Capture;

pub use command::{Borg, CheckScope};
pub use dispatch::{Dispatcher, Outcome};
pub use state::OperationState;

/// Every external process the wrapper launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    VerifyRepository,
    PreRun,
    Create,
    Prune,
    PostRun,
    CheckRepository,
    CheckArchives,
    Repair,
    Info,
    ListArchives,
    Extract,
    ExportTar,
    BreakLock,
}

impl Operation {
    /// Process exit code when this operation fails.
    pub fn exit_code(&self) -> i32 {
        match self {
            Operation::VerifyRepository
            | Operation::PreRun
            | Operation::Create
            | Operation::PostRun => 4,
            Operation::Prune => 5,
            Operation::Extract | Operation::ExportTar => 6,
            Operation::CheckRepository | Operation::CheckArchives => 7,
            Operation::Info => 8,
            Operation::ListArchives | Operation::Repair => 9,
            Operation::BreakLock => 10,
        }
    }

    /// Prefix for captured output lines in the log.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::VerifyRepository => "VERIFY",
            Operation::PreRun => "PRE-RUN",
            Operation::Create => "BACKUP",
            Operation::Prune => "PRUNE",
            Operation::PostRun => "POST-RUN",
            Operation::CheckRepository => "CHECK REPOSITORY",
            Operation::CheckArchives => "CHECK ARCHIVES",
            Operation::Repair => "REPAIR",
            Operation::Info => "INFO",
            Operation::ListArchives => "LIST",
            Operation::Extract => "EXTRACT",
            Operation::ExportTar => "EXPORT-TAR",
            Operation::BreakLock => "UNLOCK",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Operation::VerifyRepository => "verify repository",
            Operation::PreRun => "execute pre-run command",
            Operation::Create => "perform backup",
            Operation::Prune => "prune repository",
            Operation::PostRun => "execute post-run command",
            Operation::CheckRepository => "verify repository integrity",
            Operation::CheckArchives => "verify archive integrity",
            Operation::Repair => "repair repository",
            Operation::Info => "obtain repository information",
            Operation::ListArchives => "list repository archives",
            Operation::Extract => "extract archive",
            Operation::ExportTar => "export archive as tarball",
            Operation::BreakLock => "unlock repository",
        }
    }

    pub fn capture(&self) -> Capture {
        match self {
            Operation::Create | Operation::Prune | Operation::Extract | Operation::ExportTar => {
                Capture::Stream
            }
            Operation::Repair => Capture::Inherit,
            _ => Capture::Bulk,
        }
    }

    /// Hooks treat every non-zero exit as failure; borg reserves 1 for
    /// warnings.
    pub fn strict(&self) -> bool {
        matches!(self, Operation::PreRun | Operation::PostRun)
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Operation::VerifyRepository => Some(
                "Make sure the destination repository was created via \"borg init\" prior to running the backup.",
            ),
            _ => None,
        }
    }

    /// Operations the user runs interactively see borg's output directly.
    pub fn echoes_output(&self) -> bool {
        matches!(
            self,
            Operation::Info
                | Operation::ListArchives
                | Operation::CheckRepository
                | Operation::CheckArchives
                | Operation::BreakLock
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
