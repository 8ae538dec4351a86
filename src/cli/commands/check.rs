use crate::borg::{CheckScope, Operation};
use crate::cli::commands::{announce, location, progress, Session};
use crate::config::model::Target;
use crate::error::Result;
use crate::notify::Notify;
use crate::settings::Settings;

/// Repository check first, then archive metadata. A failed repository check
/// stops before the archives are read.
pub fn verify_integrity(settings: &Settings, target: &Target, notifier: &dyn Notify) -> Result<()> {
    announce(&format!(
        "Verifying {} repository integrity...",
        location(target)
    ));
    let session = Session::prepare(settings, target, notifier)?;
    let borg = session.borg();

    progress("Verifying repository integrity...");
    session
        .dispatcher
        .execute(Operation::CheckRepository, borg.check(CheckScope::Repository))?;

    progress("Verifying archive integrity...");
    session
        .dispatcher
        .execute(Operation::CheckArchives, borg.check(CheckScope::Archives))?;
    Ok(())
}

/// `borg check --repair` asks for confirmation, so it runs attached to the
/// terminal.
pub fn repair(settings: &Settings, target: &Target, notifier: &dyn Notify) -> Result<()> {
    announce(&format!("Repairing {} repository...", location(target)));
    let session = Session::prepare(settings, target, notifier)?;
    progress("Repairing repository...");
    session
        .dispatcher
        .execute(Operation::Repair, session.borg().check(CheckScope::Repair))?;
    Ok(())
}
