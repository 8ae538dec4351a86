use std::path::Path;
use std::process::Command;

use crate::context::ExecutionContext;
use crate::types::{RestoreSpec, RunMode};
use crate::util::command::shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckScope {
    Repository,
    Archives,
    Repair,
}

impl CheckScope {
    fn flag(&self) -> &'static str {
        match self {
            CheckScope::Repository => "--repository-only",
            CheckScope::Archives => "--archives-only",
            CheckScope::Repair => "--repair",
        }
    }
}

/// Builds argument vectors for the borg executable. Nothing here goes
/// through a shell, so paths and patterns need no quoting.
#[derive(Debug, Clone, Copy)]
pub struct Borg<'a> {
    executable: &'a Path,
    ctx: &'a ExecutionContext,
    mode: RunMode,
}

impl<'a> Borg<'a> {
    pub fn new(executable: &'a Path, ctx: &'a ExecutionContext, mode: RunMode) -> Self {
        Self {
            executable,
            ctx,
            mode,
        }
    }

    fn base(&self) -> Command {
        let mut cmd = Command::new(self.executable);
        self.ctx.apply(&mut cmd);
        cmd.arg(if self.mode.verbose { "--debug" } else { "--info" });
        cmd
    }

    fn stats_or_dry_run(&self, cmd: &mut Command) {
        cmd.arg(if self.mode.dry_run { "--dry-run" } else { "--stats" });
    }

    fn list_if_verbose(&self, cmd: &mut Command) {
        if self.mode.verbose {
            cmd.arg("--list");
        }
    }

    pub fn create(&self, archive: &str, checkpoint_interval: u64) -> Command {
        let mut cmd = self.base();
        cmd.arg("--remote-ratelimit")
            .arg(self.ctx.rate_limit.to_string())
            .arg("create");
        self.stats_or_dry_run(&mut cmd);
        self.list_if_verbose(&mut cmd);
        for pattern in &self.ctx.excludes {
            cmd.arg("--exclude").arg(pattern);
        }
        cmd.arg("--checkpoint-interval")
            .arg(checkpoint_interval.to_string())
            .arg(self.ctx.archive(archive))
            .args(&self.ctx.sources);
        cmd
    }

    pub fn prune(&self) -> Command {
        let mut cmd = self.base();
        cmd.arg("prune");
        self.stats_or_dry_run(&mut cmd);
        if self.mode.force_prune {
            cmd.arg("--force");
        }
        self.list_if_verbose(&mut cmd);
        for (slice, count) in self.ctx.retention.flags() {
            cmd.arg(slice.flag()).arg(count.to_string());
        }
        cmd.arg(&self.ctx.repository);
        cmd
    }

    pub fn info(&self) -> Command {
        let mut cmd = self.base();
        cmd.arg("info").arg(&self.ctx.repository);
        cmd
    }

    pub fn list(&self) -> Command {
        let mut cmd = self.base();
        cmd.arg("list").arg("--short").arg(&self.ctx.repository);
        cmd
    }

    pub fn check(&self, scope: CheckScope) -> Command {
        let mut cmd = self.base();
        cmd.arg("check").arg(scope.flag()).arg(&self.ctx.repository);
        cmd
    }

    pub fn extract(&self, spec: &RestoreSpec) -> Command {
        let mut cmd = self.base();
        cmd.arg("extract");
        self.list_if_verbose(&mut cmd);
        cmd.arg(self.ctx.archive(&spec.archive));
        if let Some(path) = &spec.path {
            cmd.arg(path);
        }
        cmd
    }

    pub fn export_tar(&self, spec: &RestoreSpec, destination: &Path) -> Command {
        let mut cmd = self.base();
        cmd.arg("export-tar");
        self.list_if_verbose(&mut cmd);
        cmd.arg(self.ctx.archive(&spec.archive)).arg(destination);
        if let Some(path) = &spec.path {
            cmd.arg(path);
        }
        cmd
    }

    pub fn break_lock(&self) -> Command {
        let mut cmd = self.base();
        cmd.arg("break-lock").arg(&self.ctx.repository);
        cmd
    }

    /// A pre/post-run hook, run through `sh -c` with the borg environment.
    pub fn hook(&self, command: &str) -> Command {
        let mut cmd = shell(command);
        self.ctx.apply(&mut cmd);
        cmd
    }
}
