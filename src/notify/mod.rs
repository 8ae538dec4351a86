pub mod sendmail;

use std::io;

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::Message;
use tracing::{debug, warn};

use crate::types::{AlertThreshold, Severity};

pub use sendmail::Sendmail;

/// Sink for operator alerts. Delivery is best effort; implementations never
/// report failure to the caller.
pub trait Notify {
    fn notify(&self, subject: &str, body: &str, severity: Severity);
}

#[derive(Debug, Clone)]
pub struct Notifier {
    threshold: AlertThreshold,
    recipient: String,
    log_file: String,
    fqdn: String,
    transport: Sendmail,
}

impl Notifier {
    pub fn new(
        threshold: AlertThreshold,
        recipient: impl Into<String>,
        log_file: impl Into<String>,
        fqdn: impl Into<String>,
        transport: Sendmail,
    ) -> Self {
        Self {
            threshold,
            recipient: recipient.into(),
            log_file: log_file.into(),
            fqdn: fqdn.into(),
            transport,
        }
    }

    fn sender(&self) -> String {
        format!("backuputil@{}", self.fqdn)
    }

    pub fn compose(&self, subject: &str, body: &str, severity: Severity) -> Result<Message> {
        let prefix = match severity {
            Severity::Error => "ERROR: ",
            Severity::Warning => "WARNING: ",
            Severity::Ok => "",
        };
        let subject = format!("{}{} - {}", prefix, self.sender(), subject);
        let body = match severity {
            Severity::Ok => body.to_string(),
            _ => format!(
                "{}\n\nSee \"{}\" on the machine for more details.",
                body, self.log_file
            ),
        };

        let from: Mailbox = self
            .sender()
            .parse()
            .with_context(|| format!("invalid sender address {}", self.sender()))?;
        let mut builder = Message::builder().from(from);
        for to in recipients(&self.recipient, &self.fqdn)? {
            builder = builder.to(to);
        }
        builder
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("unable to build notification message")
    }
}

impl Notify for Notifier {
    fn notify(&self, subject: &str, body: &str, severity: Severity) {
        if !self.threshold.allows(severity) {
            return;
        }
        debug!("Sending {} email notification...", severity);
        let sent = self
            .compose(subject, body, severity)
            .and_then(|message| self.transport.send(&message));
        if let Err(err) = sent {
            warn!("Unable to send email notification - {:#}", err);
        }
    }
}

/// Parses a comma-separated recipient list. Bare local names such as `root`
/// are qualified with `domain`, which the local MTA delivers on this host.
pub fn recipients(list: &str, domain: &str) -> Result<Vec<Mailbox>> {
    list.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(|address| {
            let qualified = if address.contains('@') {
                address.to_string()
            } else {
                format!("{}@{}", address, domain)
            };
            qualified
                .parse::<Mailbox>()
                .with_context(|| format!("invalid recipient address {}", address))
        })
        .collect()
}

/// Fully-qualified name of this machine as reported by the OS.
pub fn local_fqdn() -> io::Result<String> {
    let name = hostname::get()?;
    name.into_string()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "hostname is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::write_script;
    use std::fs;
    use std::path::Path;

    fn capturing_notifier(dir: &Path, threshold: AlertThreshold) -> Notifier {
        let capture = dir.join("captured.eml");
        let script = write_script(
            &dir.join("sendmail"),
            &format!("[ \"$1\" = \"-t\" ] || exit 9\ncat >> '{}'\n", capture.display()),
        );
        Notifier::new(
            threshold,
            "ops@example.com, oncall@example.com",
            "/var/log/backuputil.log",
            "bk.example.com",
            Sendmail::new(script),
        )
    }

    #[test]
    fn error_message_has_prefix_and_log_pointer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notifier = capturing_notifier(dir.path(), AlertThreshold::Error);
        notifier.notify("Unable to perform backup", "borg exited with 2", Severity::Error);

        let sent = fs::read_to_string(dir.path().join("captured.eml")).expect("captured");
        assert!(sent.contains(
            "Subject: ERROR: backuputil@bk.example.com - Unable to perform backup"
        ));
        assert!(sent.contains("From: backuputil@bk.example.com"));
        assert!(sent.contains("ops@example.com"));
        assert!(sent.contains("oncall@example.com"));
        assert!(sent.contains("borg exited with 2"));
        assert!(sent.contains("See \"/var/log/backuputil.log\" on the machine for more details."));
    }

    #[test]
    fn local_recipient_is_delivered_on_this_host() {
        let dir = tempfile::tempdir().expect("tempdir");
        let capture = dir.path().join("captured.eml");
        let script = write_script(
            &dir.path().join("sendmail"),
            &format!("cat >> '{}'\n", capture.display()),
        );
        let notifier = Notifier::new(
            AlertThreshold::Error,
            "root",
            "/var/log/backuputil.log",
            "bk.example.com",
            Sendmail::new(script),
        );
        notifier.notify("Unable to perform backup", "boom", Severity::Error);

        let sent = fs::read_to_string(&capture).expect("captured");
        assert!(sent.contains("To: root@bk.example.com"));
    }

    #[test]
    fn recipient_list_parsing() {
        let parsed = recipients(" ops@example.com, root ,, ", "bk.example.com").expect("parse");
        let addresses: Vec<String> = parsed.iter().map(|m| m.email.to_string()).collect();
        assert_eq!(addresses, vec!["ops@example.com", "root@bk.example.com"]);
        assert!(recipients("ops@@example.com", "bk.example.com").is_err());
    }

    #[test]
    fn threshold_filters_messages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notifier = capturing_notifier(dir.path(), AlertThreshold::Error);
        notifier.notify("Backup complete", "all good", Severity::Ok);
        notifier.notify("Archive warning", "file changed", Severity::Warning);
        assert!(!dir.path().join("captured.eml").exists());

        let notifier = capturing_notifier(dir.path(), AlertThreshold::Never);
        notifier.notify("Unable to perform backup", "boom", Severity::Error);
        assert!(!dir.path().join("captured.eml").exists());
    }

    #[test]
    fn completion_message_has_no_prefix() {
        let notifier = Notifier::new(
            AlertThreshold::Completion,
            "ops@example.com",
            "/var/log/backuputil.log",
            "bk.example.com",
            Sendmail::default(),
        );
        let message = notifier
            .compose("Backup complete", "created archive", Severity::Ok)
            .expect("compose");
        let text = String::from_utf8(message.formatted()).expect("utf8");
        assert!(text.contains("Subject: backuputil@bk.example.com - Backup complete"));
        assert!(!text.contains("on the machine for more details"));
    }

    #[test]
    fn transport_failure_is_swallowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(&dir.path().join("sendmail"), "exit 75\n");
        let notifier = Notifier::new(
            AlertThreshold::Completion,
            "ops@example.com",
            "",
            "bk.example.com",
            Sendmail::new(script),
        );
        notifier.notify("Backup complete", "ok", Severity::Ok);

        let missing = Notifier::new(
            AlertThreshold::Completion,
            "ops@example.com",
            "",
            "bk.example.com",
            Sendmail::new(dir.path().join("absent")),
        );
        missing.notify("Backup complete", "ok", Severity::Ok);
    }
}
