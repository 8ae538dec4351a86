use std::process::Command;

use tracing::{debug, info, warn};

use crate::borg::{Operation, OperationState};
use crate::cli::output;
use crate::critical;
use crate::error::{OperationError, ALERT_PREAMBLE};
use crate::notify::Notify;
use crate::types::Severity;
use crate::util::command::{describe, run};

#[derive(Debug, Clone)]
pub struct Outcome {
    pub state: OperationState,
    pub lines: Vec<String>,
}

impl Outcome {
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }
}

/// Runs one operation at a time and applies the exit-code policy: warnings
/// are reported and passed through, failures become [`OperationError`].
pub struct Dispatcher<'a> {
    notifier: &'a dyn Notify,
}

impl<'a> Dispatcher<'a> {
    pub fn new(notifier: &'a dyn Notify) -> Self {
        Self { notifier }
    }

    pub fn execute(&self, operation: Operation, cmd: Command) -> Result<Outcome, OperationError> {
        debug!("{} COMMAND: {}", operation.label(), describe(&cmd));
        let state = OperationState::NotStarted.launch();
        let finished = match run(cmd, operation.capture()) {
            Ok(finished) => finished,
            Err(source) => {
                debug!("{} STATE: {:?}", operation.label(), state.fault());
                return Err(OperationError::Spawn { operation, source });
            }
        };
        match finished.code {
            Some(code) => debug!("{} EXIT CODE: {}", operation.label(), code),
            None => debug!("{} EXIT CODE: NONE (terminated by signal)", operation.label()),
        }

        let state = state.exit(finished.code, operation.strict());
        debug_assert!(state.is_terminal());
        self.record(operation, state, &finished.lines);

        match state {
            OperationState::Succeeded => Ok(Outcome {
                state,
                lines: finished.lines,
            }),
            OperationState::Warned => {
                output::warning("Warning: subprocess returned warning-level exit code.");
                warn!("{} subprocess returned warning-level exit code.", operation.label());
                self.notifier.notify(
                    &format!("{} subprocess returned warning-level exit code", operation.label()),
                    &format!(
                        "{} it encountered a warning-level exit code while attempting to {}.",
                        ALERT_PREAMBLE,
                        operation.action()
                    ),
                    Severity::Warning,
                );
                Ok(Outcome {
                    state,
                    lines: finished.lines,
                })
            }
            _ => Err(OperationError::Failed {
                operation,
                code: finished.code,
            }),
        }
    }

    /// Logs captured lines at the level of the final state, and echoes them
    /// for interactive operations.
    fn record(&self, operation: Operation, state: OperationState, lines: &[String]) {
        let label = operation.label();
        let severity = state.severity();
        for line in lines {
            match severity {
                Severity::Ok => info!("{} OUTPUT: {}", label, line),
                Severity::Warning => warn!("{} OUTPUT: {}", label, line),
                Severity::Error => critical!("{} OUTPUT: {}", label, line),
            }
            if operation.echoes_output() {
                if severity == Severity::Ok {
                    output::detail(line);
                } else {
                    output::detail_err(line);
                }
            }
        }
    }
}
