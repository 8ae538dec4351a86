use chrono::Local;
use tracing::info;

use crate::borg::Operation;
use crate::cli::commands::{announce, location, progress, Session};
use crate::config::model::Target;
use crate::error::Result;
use crate::notify::Notify;
use crate::settings::Settings;
use crate::types::Severity;

/// Captured borg output kept for the completion e-mail.
#[derive(Debug, Clone, Default)]
pub struct BackupReport {
    pub backup_output: String,
    pub prune_output: String,
}

/// verify -> pre-run -> create -> prune -> post-run. Hooks are skipped in
/// dry-run mode and prune only runs with a retention policy.
pub fn run_backup(settings: &Settings, target: &Target, notifier: &dyn Notify) -> Result<BackupReport> {
    if settings.mode.dry_run {
        announce(&format!("Executing {} (DRY RUN)...", target.name));
    } else {
        announce(&format!("Executing {}...", target.name));
    }
    let session = Session::prepare(settings, target, notifier)?;
    let borg = session.borg();

    progress(&format!("Verifying {} repository...", location(target)));
    session
        .dispatcher
        .execute(Operation::VerifyRepository, borg.info())?;

    if let Some(pre_run) = &session.ctx.pre_run {
        if settings.mode.dry_run {
            info!("Skipping pre-run command \"{}\" (dry run).", pre_run);
        } else {
            info!("Executing pre-run command \"{}\"...", pre_run);
            progress(pre_run);
            session.dispatcher.execute(Operation::PreRun, borg.hook(pre_run))?;
        }
    }

    let archive = Local::now().format(&settings.timestamp_format).to_string();
    info!("Performing backup...");
    progress("Performing backup...");
    let created = session.dispatcher.execute(
        Operation::Create,
        borg.create(&archive, settings.checkpoint_interval),
    )?;

    let mut report = BackupReport {
        backup_output: created.output(),
        prune_output: String::new(),
    };

    if !session.ctx.retention.is_empty() {
        info!("Pruning old backups...");
        progress("Pruning old backups...");
        let pruned = session.dispatcher.execute(Operation::Prune, borg.prune())?;
        report.prune_output = pruned.output();
    }

    if let Some(post_run) = &session.ctx.post_run {
        if settings.mode.dry_run {
            info!("Skipping post-run command \"{}\" (dry run).", post_run);
        } else {
            info!("Executing post-run command \"{}\"...", post_run);
            progress(post_run);
            session
                .dispatcher
                .execute(Operation::PostRun, borg.hook(post_run))?;
        }
    }

    Ok(report)
}

pub fn completion_body(settings: &Settings, target: &str, report: &BackupReport) -> String {
    let mut body = format!(
        "The backuputil script reports that it has successfully finished executing the \"{}\" target.",
        target
    );
    let suppressed = if settings.mode.verbose {
        Some("the script was executed at a \"debug\" log level")
    } else if settings.mode.dry_run {
        Some("the script was executed as a dry-run")
    } else {
        None
    };
    match suppressed {
        Some(reason) => {
            body.push_str(&format!(
                "\n\nThe output of the underlying process has been suppressed from this email since {}. \
                 Please check the configured log file on the executing machine for the full output.",
                reason
            ));
        }
        None => {
            if !report.backup_output.is_empty() {
                body.push_str("\n\n---------- Backup Subprocess Output ----------\n");
                body.push_str(&report.backup_output);
            }
            if !report.prune_output.is_empty() {
                body.push_str("\n---------- Prune Subprocess Output ----------\n");
                body.push_str(&report.prune_output);
            }
        }
    }
    body
}

pub fn notify_completion(
    settings: &Settings,
    target: &str,
    report: &BackupReport,
    notifier: &dyn Notify,
) {
    notifier.notify(
        &format!("Successfully executed \"{}\" target", target),
        &completion_body(settings, target, report),
        Severity::Ok,
    );
}
