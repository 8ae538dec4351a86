use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::config::model::{Retention, Target, TargetDefaults};
use crate::error::ContextError;
use crate::types::Secret;
use crate::util::paths::{absolute, expand, resolve_source};

pub const BORG_RSH: &str = "BORG_RSH";
pub const BORG_PASSPHRASE: &str = "BORG_PASSPHRASE";

/// Everything a run needs to know about its target, with target overrides
/// merged over the command-line defaults. Built once, then only read.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub sources: Vec<PathBuf>,
    pub repository: String,
    pub rate_limit: u64,
    pub retention: Retention,
    pub excludes: Vec<String>,
    pub pre_run: Option<String>,
    pub post_run: Option<String>,
    borg_rsh: String,
    passphrase: Secret,
}

impl ExecutionContext {
    pub fn build(target: &Target, defaults: &TargetDefaults) -> Result<Self, ContextError> {
        let mut sources = Vec::new();
        for src in &target.src_paths {
            sources.extend(resolve_source(src).map_err(ContextError::Source)?);
        }
        debug!("Source Paths: {:?}", sources);

        let destination = absolute(&target.dst_path);
        debug!("Destination Path: {}", destination.display());

        let excludes: Vec<String> = target.exclude.iter().map(|e| expand(e)).collect();
        debug!("Excluded Paths: {:?}", excludes);

        let rate_limit = target.rate_limit.unwrap_or(defaults.rate_limit);
        debug!("Transfer Rate Limit: {} KiB/s", rate_limit);

        let server = target.dst_srv.clone();
        debug!("Destination Server: {}", server.as_deref().unwrap_or("NONE"));

        let cert_path = absolute(target.cert_path.as_deref().unwrap_or(&defaults.cert_path));
        debug!("Certificate Path: {}", cert_path.display());

        let passphrase = target
            .password
            .clone()
            .map(Secret::new)
            .unwrap_or_else(|| defaults.password.clone());
        debug!("Repository Password: {:?}", passphrase);

        let user = target.user.clone().unwrap_or_else(|| defaults.user.clone());
        debug!("Remote Connection User: {}", user);

        let retention = target.keep.clone().unwrap_or_default();
        debug!("Pruning Configuration (keep): {:?}", retention);

        let pre_run = hook(target.pre_run.as_deref(), &defaults.pre_run);
        debug!("Pre-run Command: {}", pre_run.as_deref().unwrap_or(""));
        let post_run = hook(target.post_run.as_deref(), &defaults.post_run);
        debug!("Post-run Command: {}", post_run.as_deref().unwrap_or(""));

        let repository = match &server {
            Some(host) => format!("{}@{}:{}", user, host, destination.display()),
            None => destination.display().to_string(),
        };
        debug!("Repository Reference String: {}", repository);

        let borg_rsh = format!(
            "ssh -i {} -o StrictHostKeyChecking=no",
            cert_path.display()
        );
        check_env_value(BORG_RSH, &borg_rsh)?;
        check_env_value(BORG_PASSPHRASE, passphrase.expose())?;
        debug!("{} = {}", BORG_RSH, borg_rsh);

        Ok(Self {
            sources,
            repository,
            rate_limit,
            retention,
            excludes,
            pre_run,
            post_run,
            borg_rsh,
            passphrase,
        })
    }

    /// `repo::archive` reference for archive-level subcommands.
    pub fn archive(&self, name: &str) -> String {
        format!("{}::{}", self.repository, name)
    }

    /// Exports the borg variables into a child's environment.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.env(BORG_RSH, &self.borg_rsh)
            .env(BORG_PASSPHRASE, self.passphrase.expose());
    }
}

/// The target value wins when present; an empty command means no hook.
fn hook(target: Option<&str>, default: &str) -> Option<String> {
    let command = target.unwrap_or(default).trim();
    (!command.is_empty()).then(|| command.to_string())
}

fn check_env_value(variable: &'static str, value: &str) -> Result<(), ContextError> {
    if value.contains('\0') {
        return Err(ContextError::EnvironmentSetupFailed {
            variable,
            reason: "contains a NUL byte".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetentionSlice;
    use std::collections::BTreeMap;
    use std::fs::File;

    fn target(src: &str) -> Target {
        Target {
            name: "home".to_string(),
            src_paths: vec![src.to_string()],
            dst_path: "/srv/borg/home".to_string(),
            dst_srv: None,
            cert_path: None,
            password: None,
            user: None,
            rate_limit: None,
            keep: None,
            exclude: Vec::new(),
            pre_run: None,
            post_run: None,
        }
    }

    fn defaults() -> TargetDefaults {
        TargetDefaults {
            cert_path: "/etc/backuputil/id.pem".to_string(),
            password: Secret::new("default-pass"),
            user: "root".to_string(),
            rate_limit: 100,
            pre_run: "echo before".to_string(),
            post_run: String::new(),
        }
    }

    fn env_of(cmd: &Command, key: &str) -> Option<String> {
        cmd.get_envs()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.map(|v| v.to_string_lossy().to_string()))
    }

    #[test]
    fn local_target_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().to_string_lossy().to_string();
        let ctx = ExecutionContext::build(&target(&src), &defaults()).expect("context");

        assert_eq!(ctx.sources, vec![dir.path().to_path_buf()]);
        assert_eq!(ctx.repository, "/srv/borg/home");
        assert_eq!(ctx.rate_limit, 100);
        assert_eq!(ctx.pre_run.as_deref(), Some("echo before"));
        assert_eq!(ctx.post_run, None);
        assert!(ctx.retention.is_empty());
        assert_eq!(ctx.archive("2024-01-01"), "/srv/borg/home::2024-01-01");
    }

    #[test]
    fn remote_repository_uses_default_user() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut t = target(&dir.path().to_string_lossy());
        t.dst_srv = Some("nas.example.com".to_string());
        let ctx = ExecutionContext::build(&t, &defaults()).expect("context");
        assert_eq!(ctx.repository, "root@nas.example.com:/srv/borg/home");
    }

    #[test]
    fn target_overrides_win() {
        let dir = tempfile::tempdir().expect("tempdir");
        File::create(dir.path().join("a.db")).expect("touch");
        File::create(dir.path().join("b.db")).expect("touch");
        let pattern = dir.path().join("*.db").to_string_lossy().to_string();

        let mut t = target(&pattern);
        t.dst_srv = Some("backup.example.com".to_string());
        t.user = Some("borg".to_string());
        t.cert_path = Some("/keys/target.pem".to_string());
        t.password = Some("target-pass".to_string());
        t.rate_limit = Some(0);
        t.pre_run = Some(String::new());
        t.keep = Some(Retention(BTreeMap::from([(RetentionSlice::Daily, 7)])));
        let ctx = ExecutionContext::build(&t, &defaults()).expect("context");

        assert_eq!(
            ctx.sources,
            vec![dir.path().join("a.db"), dir.path().join("b.db")]
        );
        assert_eq!(ctx.repository, "borg@backup.example.com:/srv/borg/home");
        assert_eq!(ctx.rate_limit, 0);
        assert_eq!(ctx.pre_run, None);
        assert!(!ctx.retention.is_empty());

        let mut cmd = Command::new("borg");
        ctx.apply(&mut cmd);
        assert_eq!(
            env_of(&cmd, BORG_RSH).as_deref(),
            Some("ssh -i /keys/target.pem -o StrictHostKeyChecking=no")
        );
        assert_eq!(env_of(&cmd, BORG_PASSPHRASE).as_deref(), Some("target-pass"));
    }

    #[test]
    fn excludes_are_expanded() {
        std::env::set_var("BACKUPUTIL_TEST_CACHE_DIR", "/var/cache/app");
        let dir = tempfile::tempdir().expect("tempdir");
        let mut t = target(&dir.path().to_string_lossy());
        t.exclude = vec!["$BACKUPUTIL_TEST_CACHE_DIR".to_string(), "*.tmp".to_string()];
        let ctx = ExecutionContext::build(&t, &defaults()).expect("context");
        assert_eq!(ctx.excludes, vec!["/var/cache/app", "*.tmp"]);
    }

    #[test]
    fn nul_byte_in_password_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut t = target(&dir.path().to_string_lossy());
        t.password = Some("bad\0pass".to_string());
        let err = ExecutionContext::build(&t, &defaults()).expect_err("nul");
        assert!(matches!(
            err,
            ContextError::EnvironmentSetupFailed {
                variable: BORG_PASSPHRASE,
                ..
            }
        ));
    }

    #[test]
    fn vanished_source_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("gone").to_string_lossy().to_string();
        let err = ExecutionContext::build(&target(&src), &defaults()).expect_err("missing");
        assert!(matches!(err, ContextError::Source(_)));
    }
}
