//! Run Logger & Accounting: captures the external sync's output,
//! extracts per-host byte counts, appends billing records, and
//! accumulates an in-memory run transcript for optional email
//! (spec.md §4.7).

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{Result, SnapbackError};

static WROTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"wrote\s+(\d+)\s+bytes\s+read\s+(\d+)\s+bytes").unwrap());

/// Accumulates the in-memory run transcript, the current billing
/// client (set by a `client <fqdn>` marker line before each sync), and
/// whether any error was logged during the run.
#[derive(Debug, Default)]
pub struct RunLog {
    lines: Vec<String>,
    current_client: Option<String>,
    charges: HashMap<String, u64>,
    errors_logged: bool,
}

impl RunLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the `client <fqdn>` marker the engine emits before
    /// invoking the sync for that host, and remember it as the target
    /// of subsequent byte-count lines.
    pub fn mark_client(&mut self, fqdn: &str) {
        self.lines.push(format!("client {fqdn}"));
        self.current_client = Some(fqdn.to_string());
    }

    /// Append each line of `text` to the transcript, crediting the read
    /// byte count of any `wrote N bytes read M bytes` summary line to
    /// the current client.
    pub fn ingest(&mut self, text: &str) {
        for line in text.lines() {
            self.lines.push(line.to_string());
            if let Some(caps) = WROTE_RE.captures(line) {
                if let (Some(client), Ok(read_bytes)) =
                    (self.current_client.clone(), caps[2].parse::<u64>())
                {
                    *self.charges.entry(client).or_insert(0) += read_bytes;
                }
            }
        }
    }

    /// Record a job-fatal error in the transcript and mark the run as
    /// having logged an error (forces an end-of-run email).
    pub fn log_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.lines.push(format!("ERROR: {message}"));
        self.errors_logged = true;
    }

    #[must_use]
    pub fn transcript(&self) -> String {
        self.lines.join("\n")
    }

    #[must_use]
    pub fn errors_logged(&self) -> bool {
        self.errors_logged
    }

    #[must_use]
    pub fn charges(&self) -> &HashMap<String, u64> {
        &self.charges
    }

    /// A compact, serializable snapshot of the run, printed as JSON
    /// when debug logging is enabled.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut charges: std::collections::BTreeMap<String, u64> = self
            .charges
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        charges.retain(|_, bytes| *bytes > 0);
        RunSummary {
            errors_logged: self.errors_logged,
            charges,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub errors_logged: bool,
    pub charges: std::collections::BTreeMap<String, u64>,
}

/// Append one `host:YYYYMMDD:bytes` line per client with nonzero
/// charges to `charge_file` (spec.md §6, "Charge file format").
///
/// # Errors
///
/// Returns an IO error if the file cannot be opened or written.
pub fn append_charges(
    charge_file: &Path,
    charges: &HashMap<String, u64>,
    date: NaiveDate,
) -> Result<()> {
    let mut clients: Vec<(&String, &u64)> = charges.iter().filter(|(_, &bytes)| bytes > 0).collect();
    if clients.is_empty() {
        return Ok(());
    }
    clients.sort_by(|a, b| a.0.cmp(b.0));

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(charge_file)
        .map_err(|e| SnapbackError::io(charge_file, e))?;

    let stamp = date.format("%Y%m%d");
    for (client, bytes) in clients {
        writeln!(file, "{client}:{stamp}:{bytes}").map_err(|e| SnapbackError::io(charge_file, e))?;
    }
    Ok(())
}

/// Append `message` to the operator-facing error log (spec.md §4.7).
///
/// # Errors
///
/// Returns an IO error if the log file cannot be opened or written.
pub fn append_error_log(log_file: &Path, message: &str) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| SnapbackError::io(log_file, e))?;
    writeln!(file, "{message}").map_err(|e| SnapbackError::io(log_file, e))?;
    Ok(())
}

/// Whether the end-of-run email should be sent: `AlwaysEmail` is set,
/// or any job-fatal error was logged this run (spec.md §4.7).
#[must_use]
pub fn should_email(always_email: bool, errors_logged: bool) -> bool {
    always_email || errors_logged
}
