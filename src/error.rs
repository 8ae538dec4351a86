use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::borg::Operation;

#[derive(Debug, Error)]
pub enum BackupUtilError {
    #[error("invalid option combination: {0}")]
    InvalidOption(String),
    #[error("unable to initialize logging system - {0}")]
    Logging(#[source] io::Error),
    #[error("unable to discern hostname - {0}")]
    Hostname(#[source] io::Error),
    #[error("{0}")]
    Environment(EnvironmentError),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Context(ContextError),
    #[error("{0}")]
    Operation(OperationError),
    #[error("{0}")]
    Restore(RestoreError),
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("specified borg executable path {0} does not exist")]
    BorgMissing(PathBuf),
    #[error("specified configuration file path {0} does not exist")]
    ConfigMissing(PathBuf),
    #[error("unable to check for existing backup processes - {0}")]
    ProcessCheck(#[source] io::Error),
    #[error("another backup process is already running (pid {0})")]
    AlreadyRunning(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration file {path} - {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to parse configuration file - {0}")]
    Malformed(#[source] serde_yaml::Error),
    #[error("invalid configuration - {0}")]
    InvalidShape(String),
    #[error("invalid target - {0} is not defined in the configuration file")]
    UnknownTarget(String),
    #[error("invalid target specification for {target} - {reason}")]
    InvalidTargetSpec {
        target: String,
        reason: TargetSpecError,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetSpecError {
    #[error("value of target key is not a mapping of target parameters")]
    NotAMapping,
    #[error("target does not specify a value for \"src_path\" or \"dst_path\"")]
    MissingPaths,
    #[error("destination path is not a path string")]
    DestinationNotString,
    #[error("\"src_path\" does not correspond to a path string or list of path strings")]
    SourceNotPathList,
    #[error("source path {0} does not exist on the local filesystem")]
    SourceNotFound(String),
    #[error("source path wildcard {0} does not resolve to existing paths on the local filesystem")]
    SourceGlobEmpty(String),
    #[error("source path wildcard {pattern} is not a valid glob - {reason}")]
    InvalidGlob { pattern: String, reason: String },
    #[error("\"keep\" specification is not a mapping of time slices")]
    KeepNotMapping,
    #[error("\"keep\" specification contains unknown time slice {0}")]
    UnknownSlice(String),
    #[error("\"keep\" count for {0} is not a non-negative integer")]
    InvalidKeepCount(String),
    #[error("\"exclude\" specification is not a list of paths")]
    ExcludeNotList,
    #[error("\"rate_limit\" specification is not a non-negative integer value")]
    InvalidRateLimit,
    #[error("\"{0}\" specification is not a command string")]
    CommandNotString(&'static str),
    #[error("\"{0}\" specification is not a string")]
    FieldNotString(&'static str),
    #[error("certificate file path {0} does not correspond to an existing file")]
    CertificateNotFound(String),
    #[error("unable to resolve hostname of destination server {0} via DNS")]
    UnresolvableServer(String),
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("unable to resolve source paths - {0}")]
    Source(TargetSpecError),
    #[error("unable to instantiate subprocess environment - {variable} {reason}")]
    EnvironmentSetupFailed {
        variable: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("unable to {} - {source}", .operation.action())]
    Spawn {
        operation: Operation,
        #[source]
        source: io::Error,
    },
    #[error("unable to {} - {}", .operation.action(), failure_detail(*.operation, *.code))]
    Failed {
        operation: Operation,
        code: Option<i32>,
    },
}

fn failure_detail(operation: Operation, code: Option<i32>) -> String {
    let kind = if operation.strict() {
        "non-zero"
    } else {
        "error-level"
    };
    match code {
        Some(code) => format!("subprocess returned {} exit code {}", kind, code),
        None => "subprocess was terminated by a signal".to_string(),
    }
}

impl OperationError {
    pub fn operation(&self) -> Operation {
        match self {
            OperationError::Spawn { operation, .. } | OperationError::Failed { operation, .. } => {
                *operation
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("specified restoration destination {0} is an existing file")]
    DestinationIsFile(PathBuf),
    #[error("unable to prepare restoration - unable to switch working directories to {path} - {source}")]
    EnterDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to finalize restoration - unable to revert working directory to {path} - {source}")]
    LeaveDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BackupUtilError>;

impl BackupUtilError {
    pub fn exit_code(&self) -> i32 {
        match self {
            BackupUtilError::InvalidOption(_)
            | BackupUtilError::Logging(_)
            | BackupUtilError::Hostname(_) => 1,
            BackupUtilError::Environment(_) => 2,
            BackupUtilError::Config(_) | BackupUtilError::Context(_) => 3,
            BackupUtilError::Operation(err) => err.operation().exit_code(),
            BackupUtilError::Restore(_) => 6,
        }
    }

    /// Short e-mail subject describing what went wrong.
    pub fn subject(&self) -> String {
        match self {
            BackupUtilError::InvalidOption(_) => "Invalid option combination".to_string(),
            BackupUtilError::Logging(_) => "Unable to initialize logging".to_string(),
            BackupUtilError::Hostname(_) => "Unable to discern hostname".to_string(),
            BackupUtilError::Environment(_) => "Unable to validate environment".to_string(),
            BackupUtilError::Config(ConfigError::Unreadable { .. }) => {
                "Unable to read configuration file".to_string()
            }
            BackupUtilError::Config(ConfigError::Malformed(_)) => {
                "Unable to parse configuration file".to_string()
            }
            BackupUtilError::Config(ConfigError::InvalidShape(_)) => {
                "Invalid configuration".to_string()
            }
            BackupUtilError::Config(ConfigError::UnknownTarget(_)) => "Invalid target".to_string(),
            BackupUtilError::Config(ConfigError::InvalidTargetSpec { .. }) => {
                "Invalid target specification".to_string()
            }
            BackupUtilError::Context(_) => "Unable to prepare execution environment".to_string(),
            BackupUtilError::Operation(err) => capitalize(&format!(
                "unable to {}",
                err.operation().action()
            )),
            BackupUtilError::Restore(_) => "Unable to restore files".to_string(),
        }
    }
}

pub const ALERT_PREAMBLE: &str = "The backuputil script reports that";

impl BackupUtilError {
    pub fn alert_body(&self) -> String {
        let mut body = format!("{} it was unable to continue:\n\n{}.", ALERT_PREAMBLE, self);
        if let BackupUtilError::Operation(err) = self {
            if let Some(hint) = err.operation().hint() {
                body.push_str("\n");
                body.push_str(hint);
            }
        }
        body
    }

    /// The one-line sentence printed to the terminal and the log.
    pub fn sentence(&self) -> String {
        format!("{}.", capitalize(&self.to_string()))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<EnvironmentError> for BackupUtilError {
    fn from(err: EnvironmentError) -> Self {
        BackupUtilError::Environment(err)
    }
}

impl From<ConfigError> for BackupUtilError {
    fn from(err: ConfigError) -> Self {
        BackupUtilError::Config(err)
    }
}

impl From<ContextError> for BackupUtilError {
    fn from(err: ContextError) -> Self {
        BackupUtilError::Context(err)
    }
}

impl From<OperationError> for BackupUtilError {
    fn from(err: OperationError) -> Self {
        BackupUtilError::Operation(err)
    }
}

impl From<RestoreError> for BackupUtilError {
    fn from(err: RestoreError) -> Self {
        BackupUtilError::Restore(err)
    }
}
