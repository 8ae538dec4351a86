use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use lettre::Message;

pub const SENDMAIL_PATH: &str = "/usr/sbin/sendmail";

/// Hands finished messages to the local MTA with `sendmail -t`, which reads
/// the recipients from the message headers.
#[derive(Debug, Clone)]
pub struct Sendmail {
    program: PathBuf,
}

impl Default for Sendmail {
    fn default() -> Self {
        Self::new(SENDMAIL_PATH)
    }
}

impl Sendmail {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn send(&self, message: &Message) -> Result<()> {
        let mut spool = tempfile::Builder::new()
            .prefix("backuputil-")
            .suffix(".email")
            .tempfile()
            .context("unable to create message spool file")?;
        spool
            .write_all(&message.formatted())
            .and_then(|_| spool.flush())
            .context("unable to write message spool file")?;
        let stdin = File::open(spool.path()).context("unable to reopen message spool file")?;

        let status = Command::new(&self.program)
            .arg("-t")
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("unable to execute {}", self.program.display()))?;
        if !status.success() {
            bail!("sendmail subprocess returned non-zero exit code");
        }
        Ok(())
    }
}
