use std::io;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::{debug, info};

use crate::cli::args::{check_env_overrides, Cli};
use crate::cli::commands::{backup, check, info as repo_info, restore, targets, unlock};
use crate::config::load::load_config;
use crate::config::validate::validate_target;
use crate::critical;
use crate::environment::validate_environment;
use crate::error::{BackupUtilError, Result};
use crate::logging;
use crate::notify::{local_fqdn, Notifier, Notify, Sendmail};
use crate::settings::{Action, Settings};
use crate::signal_handler::signal_handler;
use crate::types::Severity;

pub mod args;
pub mod commands;
pub mod output;

/// Entry point behind `main`; returns the process exit code.
pub fn run() -> i32 {
    if let Err(msg) = check_env_overrides() {
        output::failure(&msg);
        return 1;
    }
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 2,
            };
            let _ = err.print();
            return code;
        }
    };
    output::set_color(cli.color);
    signal_handler();

    if cli.list_targets {
        return targets::list_targets(&cli.config_file, &mut io::stdout().lock());
    }

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            output::failure(&err.sentence());
            return err.exit_code();
        }
    };

    if let Err(err) = logging::init(&settings.log_file, settings.log_level, settings.log_mode) {
        let err = BackupUtilError::Logging(err);
        output::failure(&err.sentence());
        return err.exit_code();
    }
    info!("Starting backuputil for target \"{}\"...", settings.target);
    debug!("Settings: {:?}", settings);

    let fqdn = match local_fqdn() {
        Ok(fqdn) => fqdn,
        Err(err) => {
            let err = BackupUtilError::Hostname(err);
            output::failure(&err.sentence());
            critical!("{}", err.sentence());
            return err.exit_code();
        }
    };
    debug!("Local FQDN: {}", fqdn);

    let notifier = Notifier::new(
        settings.email_level,
        settings.email_to.clone(),
        settings.log_file.clone(),
        fqdn,
        Sendmail::default(),
    );

    match execute(&settings, &notifier) {
        Ok(()) => {
            output::step("Process complete.");
            info!("Process complete.");
            0
        }
        Err(err) => {
            output::failure(&err.sentence());
            critical!("{}", err.sentence());
            notifier.notify(&err.subject(), &err.alert_body(), Severity::Error);
            err.exit_code()
        }
    }
}

fn execute(settings: &Settings, notifier: &dyn Notify) -> Result<()> {
    validate_environment(&settings.borg, &settings.config_file)?;
    dispatch(settings, notifier)
}

/// Loads the configuration, validates the target and runs the action.
fn dispatch(settings: &Settings, notifier: &dyn Notify) -> Result<()> {
    output::step("Parsing configuration file...");
    info!("Parsing configuration file...");
    let config = load_config(&settings.config_file)?;
    output::substep("Validating target specification...");
    debug!("Validating target specification...");
    let target = validate_target(&config, &settings.target, &settings.defaults)?;
    if let Ok(dump) = serde_yaml::to_string(&target) {
        debug!("Target Specification:\n{}", dump.trim_end());
    }

    match &settings.action {
        Action::Backup => {
            let report = backup::run_backup(settings, &target, notifier)?;
            backup::notify_completion(settings, &target.name, &report, notifier);
        }
        Action::Info => repo_info::show_info(settings, &target, notifier)?,
        Action::ListArchives => repo_info::list_archives(settings, &target, notifier)?,
        Action::Restore { spec, destination } => {
            restore::restore(settings, &target, spec, destination, notifier)?
        }
        Action::VerifyIntegrity => check::verify_integrity(settings, &target, notifier)?,
        Action::Repair => check::repair(settings, &target, notifier)?,
        Action::Unlock => unlock::unlock(settings, &target, notifier)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::{borg_calls, fake_borg, settings_for, RecordingNotifier};
    use std::fs;

    #[test]
    fn dispatch_runs_the_selected_action() {
        let dir = tempfile::tempdir().expect("tempdir");
        let borg = fake_borg(dir.path(), "exit 0\n");
        let config = dir.path().join("backuputil.yaml");
        fs::write(
            &config,
            format!(
                "targets:\n  home:\n    src_path: {}\n    dst_path: /srv/borg/home\n",
                dir.path().display()
            ),
        )
        .expect("write");
        let mut settings = settings_for(&borg, Action::Unlock);
        settings.config_file = config;

        dispatch(&settings, &RecordingNotifier::default()).expect("unlock");
        assert_eq!(
            borg_calls(dir.path()),
            vec!["--info break-lock /srv/borg/home"]
        );
    }

    #[test]
    fn unknown_target_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let borg = fake_borg(dir.path(), "exit 0\n");
        let config = dir.path().join("backuputil.yaml");
        fs::write(&config, "targets:\n  other:\n    src_path: /\n    dst_path: /srv\n")
            .expect("write");
        let mut settings = settings_for(&borg, Action::Backup);
        settings.config_file = config;

        let err = dispatch(&settings, &RecordingNotifier::default()).expect_err("unknown");
        assert_eq!(err.exit_code(), 3);
        assert!(borg_calls(dir.path()).is_empty());
    }

    #[test]
    fn missing_executable_is_an_environment_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_for(&dir.path().join("no-borg"), Action::Backup);
        let err = execute(&settings, &RecordingNotifier::default()).expect_err("missing");
        assert_eq!(err.exit_code(), 2);
    }
}
