use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::cli::output;
use crate::error::EnvironmentError;
use crate::util::command::{run, Capture};

const PIDOF: &str = "pidof";

/// Pre-flight checks run before the configuration is loaded.
pub fn validate_environment(borg: &Path, config: &Path) -> Result<(), EnvironmentError> {
    output::step("Validating environment...");
    info!("Validating environment...");

    output::substep("Validating borg executable path...");
    debug!("Validating borg executable path...");
    if !borg.is_file() {
        return Err(EnvironmentError::BorgMissing(borg.to_path_buf()));
    }

    output::substep("Validating configuration file path...");
    debug!("Validating configuration file path...");
    if !config.is_file() {
        return Err(EnvironmentError::ConfigMissing(config.to_path_buf()));
    }

    output::substep("Checking for existing backup processes...");
    debug!("Checking for existing backup processes...");
    let name = borg
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    check_running(Path::new(PIDOF), &name)
}

/// Advisory only: a borg started between this check and our own launch is
/// not detected.
fn check_running(pidof: &Path, name: &str) -> Result<(), EnvironmentError> {
    let mut cmd = Command::new(pidof);
    cmd.arg("-x").arg(name);
    let finished = run(cmd, Capture::Bulk).map_err(EnvironmentError::ProcessCheck)?;
    let pids = finished.lines.join(" ").trim().to_string();
    debug!(
        "Existing Process Check Exit Code: {}",
        finished.code.map_or("NONE".to_string(), |c| c.to_string())
    );
    if !pids.is_empty() {
        debug!("Existing Process ID (or subprocess output): {}", pids);
    }
    if finished.code == Some(0) {
        return Err(EnvironmentError::AlreadyRunning(pids));
    }
    Ok(())
}
