use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};

use crate::cli::args::Cli;
use crate::config::model::TargetDefaults;
use crate::error::{BackupUtilError, Result};
use crate::notify::recipients;
use crate::types::{AlertThreshold, LogLevel, LogMode, RestoreSpec, RunMode, Secret};

/// What this invocation does with the selected target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Backup,
    Info,
    ListArchives,
    Restore {
        spec: RestoreSpec,
        destination: PathBuf,
    },
    VerifyIntegrity,
    Repair,
    Unlock,
}

/// Immutable run configuration derived once from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    pub target: String,
    pub action: Action,
    pub borg: PathBuf,
    pub config_file: PathBuf,
    pub checkpoint_interval: u64,
    pub timestamp_format: String,
    pub mode: RunMode,
    pub log_file: String,
    pub log_level: LogLevel,
    pub log_mode: LogMode,
    pub email_level: AlertThreshold,
    pub email_to: String,
    pub defaults: TargetDefaults,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let target = cli
            .target
            .clone()
            .ok_or_else(|| BackupUtilError::InvalidOption("no target specified".to_string()))?;
        if cli.email_level != AlertThreshold::Never {
            if cli.email_to.trim().is_empty() {
                return Err(BackupUtilError::InvalidOption(
                    "\"--email-to\" not specified".to_string(),
                ));
            }
            recipients(&cli.email_to, "localhost")
                .map_err(|err| BackupUtilError::InvalidOption(format!("{:#}", err)))?;
        }
        if !is_valid_strftime(&cli.timestamp_format) {
            return Err(BackupUtilError::InvalidOption(format!(
                "\"{}\" is not a valid timestamp format",
                cli.timestamp_format
            )));
        }

        Ok(Self {
            target,
            action: action_for(cli),
            // extract changes directory, so a relative executable must be
            // pinned first
            borg: std::path::absolute(&cli.borg_executable)
                .unwrap_or_else(|_| cli.borg_executable.clone()),
            config_file: cli.config_file.clone(),
            checkpoint_interval: cli.checkpoint_interval,
            timestamp_format: cli.timestamp_format.clone(),
            mode: RunMode {
                dry_run: cli.dry_run,
                verbose: cli.log_level == LogLevel::Debug,
                force_prune: cli.force_prune,
            },
            log_file: cli.log_file.clone(),
            log_level: cli.log_level,
            log_mode: cli.log_mode,
            email_level: cli.email_level,
            email_to: cli.email_to.clone(),
            defaults: TargetDefaults {
                cert_path: cli.cert_path.clone(),
                password: Secret::new(cli.password.clone()),
                user: cli.user.clone(),
                rate_limit: cli.rate_limit,
                pre_run: cli.pre_run.clone(),
                post_run: cli.post_run.clone(),
            },
        })
    }
}

/// First matching mode wins: unlock, info, list, restore, verify, repair.
fn action_for(cli: &Cli) -> Action {
    if cli.unlock {
        Action::Unlock
    } else if cli.info {
        Action::Info
    } else if cli.list_archives {
        Action::ListArchives
    } else if let Some(spec) = &cli.restore {
        Action::Restore {
            spec: spec.clone(),
            destination: cli
                .restore_to
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    } else if cli.verify_integrity {
        Action::VerifyIntegrity
    } else if cli.repair {
        Action::Repair
    } else {
        Action::Backup
    }
}

fn is_valid_strftime(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}
