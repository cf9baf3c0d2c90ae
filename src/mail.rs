//! Mail submission: sends the end-of-run transcript to the configured
//! administrator (spec.md §4.7, §6 "Mail submission").

use std::sync::Arc;

use crate::command::CommandRunner;
use crate::error::{Result, SnapbackError};

/// Delivers a message to a recipient. Implemented for a real `-t`-style
/// sendmail program and, for tests and hosts with no `AdminEmail`
/// configured, a no-op.
pub trait MailSender: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the mail program cannot be spawned or exits
    /// non-zero.
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Invokes the configured `SendMail` program, feeding it a
/// `To:`/`Subject:` header block and the body on stdin (spec.md §6).
pub struct SendmailMailSender {
    runner: Arc<dyn CommandRunner>,
    /// The configured `SendMail` command, tokenized: program followed
    /// by its fixed flags (e.g. `["/usr/sbin/sendmail", "-t"]`).
    command: Vec<String>,
}

impl SendmailMailSender {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, configured: &str) -> Self {
        let command = configured
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>();
        Self { runner, command }
    }
}

impl MailSender for SendmailMailSender {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(SnapbackError::Other(anyhow::anyhow!(
                "SendMail directive resolved to an empty command"
            )));
        };
        let stdin = format!("To: {to}\nSubject: {subject}\n\n{body}\n");
        let output = self
            .runner
            .run_with_stdin(program, args, None, &stdin)?;
        if !output.success() {
            return Err(SnapbackError::CommandFailed {
                program: program.clone(),
                status: output.status,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

/// Discards every message. Used in tests and when no `AdminEmail` is
/// configured for a run.
#[derive(Debug, Default)]
pub struct NullMailSender;

impl MailSender for NullMailSender {
    fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}
