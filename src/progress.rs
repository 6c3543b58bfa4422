//! Progress reporting for discovery and batch execution.
//!
//! Two separate streams exist. Diagnostics go through `tracing`. The
//! user-facing log, one [`LogEntry`] per line, goes to whatever
//! [`LogSink`] the caller binds: a closure, a channel feeding a UI thread,
//! or a terminal printer.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// Marker the tool prints on in-flight transfer lines.
pub const DOWNLOAD_MARKER: &str = "[download]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Success => "OK",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// One line of user-visible progress output. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub text: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Info)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Success)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Warning)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Error)
    }
}

/// Ordered, thread-safe destination for [`LogEntry`] values.
///
/// Entries are emitted from background tasks; implementations marshal
/// them to wherever they need to go.
pub trait LogSink: Send + Sync {
    fn log(&self, entry: LogEntry);
}

impl<F> LogSink for F
where
    F: Fn(LogEntry) + Send + Sync,
{
    fn log(&self, entry: LogEntry) {
        self(entry)
    }
}

/// Sink forwarding every entry into a channel, e.g. one drained on a UI thread.
pub fn channel_sink(tx: UnboundedSender<LogEntry>) -> impl LogSink {
    move |entry: LogEntry| {
        // receiver gone means nobody is listening anymore
        let _ = tx.send(entry);
    }
}

/// Severity for a line read from the tool's standard error, or `None`
/// when the line should be dropped.
///
/// Transfer progress lines are suppressed unless they report completion.
pub fn classify_stderr_line(line: &str) -> Option<Severity> {
    if line.trim().is_empty() {
        return None;
    }
    if line.contains(DOWNLOAD_MARKER) && !line.contains("100%") {
        return None;
    }
    if line.contains("WARNING") {
        Some(Severity::Warning)
    } else {
        Some(Severity::Error)
    }
}

/// Tracks completion statistics for one batch run.
///
/// # Examples
///
/// ```
/// use ytbatch::BatchSummary;
///
/// let mut summary = BatchSummary::new(3);
/// summary.record_completed();
/// assert_eq!(summary.remaining(), 2);
/// ```
#[derive(Debug)]
pub struct BatchSummary {
    pub total_jobs: usize,
    pub completed: usize,
    pub start_time: Instant,
}

impl BatchSummary {
    pub fn new(total_jobs: usize) -> Self {
        Self {
            total_jobs,
            completed: 0,
            start_time: Instant::now(),
        }
    }

    pub fn record_completed(&mut self) {
        self.completed += 1;
        info!(
            completed = self.completed,
            total = self.total_jobs,
            eta_secs = self.estimated_remaining().as_secs(),
            "Job finished ({:.1}%)",
            self.percent()
        );
    }

    pub fn remaining(&self) -> usize {
        self.total_jobs.saturating_sub(self.completed)
    }

    pub fn percent(&self) -> f64 {
        if self.total_jobs == 0 {
            return 100.0;
        }
        (self.completed as f64 / self.total_jobs as f64) * 100.0
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Rough time left, extrapolated from the average job duration so far.
    pub fn estimated_remaining(&self) -> Duration {
        if self.completed == 0 {
            return Duration::from_secs(0);
        }
        let per_job = self.elapsed().div_f64(self.completed as f64);
        per_job.mul_f64(self.remaining() as f64)
    }
}
