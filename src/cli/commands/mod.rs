pub mod backup;
pub mod check;
pub mod info;
pub mod restore;
pub mod targets;
pub mod unlock;

use tracing::debug;

use crate::borg::{Borg, Dispatcher};
use crate::cli::output;
use crate::config::model::Target;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::notify::Notify;
use crate::settings::Settings;

/// Per-run state shared by the repository commands.
pub struct Session<'a> {
    pub settings: &'a Settings,
    pub ctx: ExecutionContext,
    pub dispatcher: Dispatcher<'a>,
}

impl<'a> Session<'a> {
    pub fn prepare(
        settings: &'a Settings,
        target: &Target,
        notifier: &'a dyn Notify,
    ) -> Result<Self> {
        debug!("Preparing execution environment...");
        output::substep("Instantiating subprocess environment...");
        let ctx = ExecutionContext::build(target, &settings.defaults)?;
        Ok(Self {
            settings,
            ctx,
            dispatcher: Dispatcher::new(notifier),
        })
    }

    pub fn borg(&self) -> Borg<'_> {
        Borg::new(&self.settings.borg, &self.ctx, self.settings.mode)
    }
}

/// "remote" or "local", for progress messages.
pub(crate) fn location(target: &Target) -> &'static str {
    if target.dst_srv.is_some() {
        "remote"
    } else {
        "local"
    }
}

pub(crate) fn announce(msg: &str) {
    output::step(msg);
    tracing::info!("{}", msg);
}

pub(crate) fn progress(msg: &str) {
    output::substep(msg);
    debug!("{}", msg);
}
