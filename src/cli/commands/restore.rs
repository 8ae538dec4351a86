use std::path::Path;

use tracing::{debug, info};

use crate::borg::Operation;
use crate::cli::commands::{announce, location, progress, Session};
use crate::config::model::Target;
use crate::error::{RestoreError, Result};
use crate::notify::Notify;
use crate::settings::Settings;
use crate::types::RestoreSpec;
use crate::util::paths::{is_tar_archive, WorkingDir};

/// Restores `spec` into `destination`. A tarball destination is written by
/// `borg export-tar`; anything else is treated as a directory and filled by
/// `borg extract` from inside it.
pub fn restore(
    settings: &Settings,
    target: &Target,
    spec: &RestoreSpec,
    destination: &Path,
    notifier: &dyn Notify,
) -> Result<()> {
    announce(&format!("Restoring from {} archive...", location(target)));
    let session = Session::prepare(settings, target, notifier)?;
    let borg = session.borg();

    progress("Preparing restoration...");
    debug!("Restore Archive: {}", spec.archive);
    debug!("Restore Path: {}", spec.path.as_deref().unwrap_or("NONE"));
    debug!("Restore Destination: {}", destination.display());
    if destination.is_file() {
        return Err(RestoreError::DestinationIsFile(destination.to_path_buf()).into());
    }

    if is_tar_archive(destination) {
        info!("Restoring files...");
        progress("Restoring files...");
        session
            .dispatcher
            .execute(Operation::ExportTar, borg.export_tar(spec, destination))?;
        return Ok(());
    }

    let workdir = WorkingDir::enter(destination)?;
    debug!("Original Working Directory: {}", workdir.original().display());
    info!("Restoring files...");
    progress("Restoring files...");
    let extracted = session
        .dispatcher
        .execute(Operation::Extract, borg.extract(spec));

    progress("Finalizing restoration...");
    let left = workdir.leave();
    extracted?;
    left?;
    Ok(())
}
