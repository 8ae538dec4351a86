use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Outcome severity of a finished subprocess, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum severity at which an e-mail goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlertThreshold {
    Never,
    Error,
    Warning,
    Completion,
}

impl AlertThreshold {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(AlertThreshold::Never),
            "error" => Ok(AlertThreshold::Error),
            "warning" => Ok(AlertThreshold::Warning),
            "completion" => Ok(AlertThreshold::Completion),
            _ => Err(format!(
                "invalid email level {}; expected never, error, warning, or completion",
                value
            )),
        }
    }

    fn minimum(&self) -> Option<Severity> {
        match self {
            AlertThreshold::Never => None,
            AlertThreshold::Error => Some(Severity::Error),
            AlertThreshold::Warning => Some(Severity::Warning),
            AlertThreshold::Completion => Some(Severity::Ok),
        }
    }

    pub fn allows(&self, severity: Severity) -> bool {
        self.minimum().is_some_and(|min| severity >= min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Info,
    Debug,
}

impl LogLevel {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(format!("invalid log level {}; expected info or debug", value)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogMode {
    Append,
    Overwrite,
}

impl LogMode {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(LogMode::Append),
            "overwrite" => Ok(LogMode::Overwrite),
            _ => Err(format!(
                "invalid log mode {}; expected append or overwrite",
                value
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunMode {
    pub dry_run: bool,
    pub verbose: bool,
    pub force_prune: bool,
}

/// Retention buckets understood by `borg prune`, in flag order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RetentionSlice {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RetentionSlice {
    pub fn flag(&self) -> &'static str {
        match self {
            RetentionSlice::Hourly => "--keep-hourly",
            RetentionSlice::Daily => "--keep-daily",
            RetentionSlice::Weekly => "--keep-weekly",
            RetentionSlice::Monthly => "--keep-monthly",
            RetentionSlice::Yearly => "--keep-yearly",
        }
    }
}

/// `ARCHIVE[:PATH]` as given to `--restore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSpec {
    pub archive: String,
    pub path: Option<String>,
}

impl FromStr for RestoreSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (archive, path) = match s.rsplit_once(':') {
            Some((archive, path)) => (archive, path.trim_start_matches('/')),
            None => (s, ""),
        };
        if archive.trim().is_empty() {
            return Err("archive name is empty".to_string());
        }
        Ok(RestoreSpec {
            archive: archive.to_string(),
            path: (!path.is_empty()).then(|| path.to_string()),
        })
    }
}

/// String whose value never shows up in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str("********")
        }
    }
}
