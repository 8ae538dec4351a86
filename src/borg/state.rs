use crate::types::Severity;

/// Lifecycle of one external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    NotStarted,
    Running,
    Succeeded,
    Warned,
    /// `code` is `None` when the process was killed by a signal.
    Failed { code: Option<i32> },
    /// The process could not be spawned or its output could not be read.
    Faulted,
}

impl OperationState {
    pub fn launch(self) -> Self {
        match self {
            OperationState::NotStarted => OperationState::Running,
            other => other,
        }
    }

    /// Applies the exit code. Strict operations (hooks) have no warning
    /// level: every non-zero code is a failure.
    pub fn exit(self, code: Option<i32>, strict: bool) -> Self {
        if self != OperationState::Running {
            return self;
        }
        match (code, strict) {
            (Some(0), _) => OperationState::Succeeded,
            (Some(1), false) => OperationState::Warned,
            (code, _) => OperationState::Failed { code },
        }
    }

    pub fn fault(self) -> Self {
        match self {
            OperationState::Running => OperationState::Faulted,
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationState::NotStarted | OperationState::Running)
    }

    pub fn severity(&self) -> Severity {
        match self {
            OperationState::Succeeded => Severity::Ok,
            OperationState::Warned => Severity::Warning,
            _ => Severity::Error,
        }
    }
}
