//! Kernel signature capture and the append-only tracking file.
//!
//! Each record is `<uname -a output>  # <timestamp>`. Two records describe
//! the same kernel when the text before the comment marker matches exactly;
//! the timestamp never takes part in the comparison.

use crate::error::{Error, Result};
use crate::exec;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Separates the kernel identity from the timestamp in a record. Kernel
/// version strings contain `#` themselves (`#14~22.04.1-Ubuntu`), so the
/// marker includes the surrounding spaces.
pub const COMMENT_MARKER: &str = "  # ";

pub const TIMESTAMP_FORMAT: &str = "%a %b %-d %H:%M:%S %Y";

/// Run `uname -a` and return its trimmed output.
pub async fn capture_identity(timeout: Duration) -> Result<String> {
    let captured = exec::capture("uname", &["-a"], timeout).await?;
    if !captured.success() {
        return Err(Error::StepFailed {
            step: 1,
            command: "uname -a".to_string(),
            code: captured.code,
            stderr: captured.stderr,
        });
    }

    let identity = captured.stdout.trim().to_string();
    if identity.is_empty() {
        return Err(Error::EmptyIdentity);
    }
    Ok(identity)
}

pub fn record_line(identity: &str, timestamp: &DateTime<Local>) -> String {
    format!(
        "{}{}{}",
        identity.trim(),
        COMMENT_MARKER,
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Kernel identity of one record.
pub fn line_identity(line: &str) -> &str {
    match line.rsplit_once(COMMENT_MARKER) {
        Some((identity, _)) => identity.trim_end(),
        None => line.trim_end(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended(String),
    AlreadyPresent,
}

#[derive(Debug, Clone)]
pub struct TrackingFile {
    path: PathBuf,
}

impl TrackingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn identities(&self) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .lines()
            .map(line_identity)
            .filter(|identity| !identity.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn contains(&self, identity: &str) -> Result<bool> {
        let identity = identity.trim();
        Ok(self
            .read()?
            .lines()
            .any(|line| line_identity(line) == identity))
    }

    /// Append a record for `identity` unless one already exists.
    ///
    /// The scan and the append are two separate opens; concurrent writers
    /// are not guarded against.
    pub fn append_if_absent(
        &self,
        identity: &str,
        timestamp: &DateTime<Local>,
    ) -> Result<AppendOutcome> {
        let content = self.read()?;
        let identity = identity.trim();

        if content.lines().any(|line| line_identity(line) == identity) {
            debug!(path = %self.path.display(), "identity already recorded");
            return Ok(AppendOutcome::AlreadyPresent);
        }

        let line = record_line(identity, timestamp);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if !content.is_empty() && !content.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        writeln!(file, "{}", line)?;

        debug!(path = %self.path.display(), %line, "identity appended");
        Ok(AppendOutcome::Appended(line))
    }
}
