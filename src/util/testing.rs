use std::cell::RefCell;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::config::model::TargetDefaults;
use crate::notify::Notify;
use crate::settings::{Action, Settings};
use crate::types::{AlertThreshold, LogLevel, LogMode, RunMode, Severity};

static CWD: Mutex<()> = Mutex::new(());

/// Serializes tests that change the process working directory.
pub fn cwd_lock() -> MutexGuard<'static, ()> {
    CWD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn write_script(path: &Path, body: &str) -> PathBuf {
    fs::write(path, format!("#!/bin/sh\n{}", body)).expect("write script");
    let mut perms = fs::metadata(path).expect("stat script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod script");
    path.to_path_buf()
}

/// Stand-in for the borg executable. Every invocation appends its argument
/// list to `calls.log` next to the script before running `body`.
pub fn fake_borg(dir: &Path, body: &str) -> PathBuf {
    let log = dir.join("calls.log");
    write_script(
        &dir.join("borg"),
        &format!("printf '%s\\n' \"$*\" >> '{}'\n{}", log.display(), body),
    )
}

pub fn borg_calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Settings for a non-interactive run against `borg`, with no hooks and no
/// logging.
pub fn settings_for(borg: &Path, action: Action) -> Settings {
    Settings {
        target: "home".to_string(),
        action,
        borg: borg.to_path_buf(),
        config_file: PathBuf::from("/etc/backuputil.yaml"),
        checkpoint_interval: 900,
        timestamp_format: "%Y-%m-%d.%H-%M-%S".to_string(),
        mode: RunMode::default(),
        log_file: String::new(),
        log_level: LogLevel::Info,
        log_mode: LogMode::Append,
        email_level: AlertThreshold::Never,
        email_to: String::new(),
        defaults: TargetDefaults::default(),
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<(String, String, Severity)>>,
}

impl RecordingNotifier {
    pub fn severities(&self) -> Vec<Severity> {
        self.sent.borrow().iter().map(|(_, _, s)| *s).collect()
    }
}

impl Notify for RecordingNotifier {
    fn notify(&self, subject: &str, body: &str, severity: Severity) {
        self.sent
            .borrow_mut()
            .push((subject.to_string(), body.to_string(), severity));
    }
}
