use std::env;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::types::{AlertThreshold, LogLevel, LogMode, RestoreSpec};

#[derive(Parser, Debug)]
#[command(
    name = "backuputil",
    version,
    about = "Backs up, prunes and restores Borg repositories described in a YAML configuration file"
)]
pub struct Cli {
    /// Target defined in the configuration file
    #[arg(required_unless_present = "list_targets")]
    pub target: Option<String>,

    /// Path to the borg executable
    #[arg(
        short = 'b',
        long,
        env = "BACKUPUTIL_BORG_PATH",
        default_value = "/usr/bin/borg"
    )]
    pub borg_executable: PathBuf,

    /// Default SSH certificate for remote repositories
    #[arg(long, env = "BACKUPUTIL_CERT_PATH", default_value = "~/.ssh/backuputil.pem")]
    pub cert_path: String,

    /// Seconds between borg checkpoints during a backup
    #[arg(
        short = 'C',
        long = "checkpoint-int",
        env = "BACKUPUTIL_CP_INTERVAL",
        default_value_t = 900
    )]
    pub checkpoint_interval: u64,

    #[arg(
        short = 'c',
        long,
        env = "BACKUPUTIL_CONFIG_FILE",
        default_value = "/etc/backuputil.yaml"
    )]
    pub config_file: PathBuf,

    /// Pass --dry-run to borg and skip pre/post-run commands
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Minimum event level that sends an e-mail
    #[arg(
        short = 'e',
        long,
        env = "BACKUPUTIL_EMAIL_LVL",
        value_enum,
        ignore_case = true,
        default_value_t = AlertThreshold::Never
    )]
    pub email_level: AlertThreshold,

    /// Comma-separated e-mail recipients
    #[arg(short = 't', long, env = "BACKUPUTIL_EMAIL_TO", default_value = "")]
    pub email_to: String,

    /// Pass --force to borg prune
    #[arg(long)]
    pub force_prune: bool,

    /// Show repository information instead of backing up
    #[arg(short = 'i', long)]
    pub info: bool,

    /// List repository archives instead of backing up
    #[arg(long)]
    pub list_archives: bool,

    /// Print the targets in the configuration file and exit
    #[arg(long)]
    pub list_targets: bool,

    /// Log file; an empty value disables logging
    #[arg(
        short = 'f',
        long,
        env = "BACKUPUTIL_LOG_FILE",
        default_value = "/var/log/backuputil.log"
    )]
    pub log_file: String,

    #[arg(
        short = 'l',
        long,
        env = "BACKUPUTIL_LOG_LVL",
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Info
    )]
    pub log_level: LogLevel,

    #[arg(
        short = 'm',
        long,
        env = "BACKUPUTIL_LOG_MODE",
        value_enum,
        ignore_case = true,
        default_value_t = LogMode::Append
    )]
    pub log_mode: LogMode,

    /// Disable colored terminal output
    #[arg(long = "no-color", action = ArgAction::SetFalse)]
    pub color: bool,

    /// Default repository passphrase
    #[arg(
        short = 'p',
        long,
        env = "BACKUPUTIL_PASSWORD",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: String,

    /// Default command run after a backup
    #[arg(long, env = "BACKUPUTIL_POST_RUN", default_value = "")]
    pub post_run: String,

    /// Default command run before a backup
    #[arg(long, env = "BACKUPUTIL_PRE_RUN", default_value = "")]
    pub pre_run: String,

    /// Default upload limit in KiB/s (0 is unlimited)
    #[arg(short = 'r', long, env = "BACKUPUTIL_RATE_LIMIT", default_value_t = 0)]
    pub rate_limit: u64,

    /// Run borg check --repair interactively
    #[arg(long)]
    pub repair: bool,

    /// Restore ARCHIVE, or only PATH inside it
    #[arg(long, value_name = "ARCHIVE[:PATH]")]
    pub restore: Option<RestoreSpec>,

    /// Restore destination directory, or a .tar.gz/.tar.bz2/.tar.xz file
    #[arg(long, value_name = "PATH")]
    pub restore_to: Option<PathBuf>,

    /// strftime format of new archive names
    #[arg(
        short = 'T',
        long = "timestamp-fmt",
        env = "BACKUPUTIL_TIMESTAMP",
        default_value = "%Y-%m-%d.%H-%M-%S"
    )]
    pub timestamp_format: String,

    /// Default remote user
    #[arg(short = 'u', long, env = "BACKUPUTIL_USER", default_value_t = default_user())]
    pub user: String,

    /// Break a stale repository lock
    #[arg(long)]
    pub unlock: bool,

    /// Check repository and archive consistency
    #[arg(short = 'v', long)]
    pub verify_integrity: bool,
}

fn default_user() -> String {
    env::var("USER")
        .or_else(|_| env::var("LOGNAME"))
        .unwrap_or_else(|_| "root".to_string())
}

/// Rejects malformed values in the environment overrides that clap would
/// otherwise report as a usage error.
pub fn check_env_overrides() -> Result<(), String> {
    check_env_overrides_with(|key| env::var(key).ok())
}

fn check_env_overrides_with(lookup: impl Fn(&str) -> Option<String>) -> Result<(), String> {
    for key in ["BACKUPUTIL_CP_INTERVAL", "BACKUPUTIL_RATE_LIMIT"] {
        if let Some(value) = lookup(key) {
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
                return Err(format!(
                    "Invalid value for {}: \"{}\" is not a non-negative integer.",
                    key, value
                ));
            }
        }
    }
    if let Some(value) = lookup("BACKUPUTIL_EMAIL_LVL") {
        AlertThreshold::parse(&value).map_err(|e| format!("BACKUPUTIL_EMAIL_LVL: {}", e))?;
    }
    if let Some(value) = lookup("BACKUPUTIL_LOG_LVL") {
        LogLevel::parse(&value).map_err(|e| format!("BACKUPUTIL_LOG_LVL: {}", e))?;
    }
    if let Some(value) = lookup("BACKUPUTIL_LOG_MODE") {
        LogMode::parse(&value).map_err(|e| format!("BACKUPUTIL_LOG_MODE: {}", e))?;
    }
    Ok(())
}
