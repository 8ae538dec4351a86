use crate::borg::Operation;
use crate::cli::commands::{announce, location, progress, Session};
use crate::config::model::Target;
use crate::error::Result;
use crate::notify::Notify;
use crate::settings::Settings;

pub fn show_info(settings: &Settings, target: &Target, notifier: &dyn Notify) -> Result<()> {
    announce(&format!(
        "Getting {} repository information...",
        location(target)
    ));
    let session = Session::prepare(settings, target, notifier)?;
    progress("Getting info...");
    session
        .dispatcher
        .execute(Operation::Info, session.borg().info())?;
    Ok(())
}

pub fn list_archives(settings: &Settings, target: &Target, notifier: &dyn Notify) -> Result<()> {
    announce(&format!(
        "Listing {} repository archives...",
        location(target)
    ));
    let session = Session::prepare(settings, target, notifier)?;
    progress("Getting archive list...");
    session
        .dispatcher
        .execute(Operation::ListArchives, session.borg().list())?;
    Ok(())
}
