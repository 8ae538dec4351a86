use crate::borg::Operation;
use crate::cli::commands::{announce, location, progress, Session};
use crate::config::model::Target;
use crate::error::Result;
use crate::notify::Notify;
use crate::settings::Settings;

pub fn unlock(settings: &Settings, target: &Target, notifier: &dyn Notify) -> Result<()> {
    announce(&format!("Unlocking {} repository...", location(target)));
    let session = Session::prepare(settings, target, notifier)?;
    progress("Unlocking repository...");
    session
        .dispatcher
        .execute(Operation::BreakLock, session.borg().break_lock())?;
    Ok(())
}
