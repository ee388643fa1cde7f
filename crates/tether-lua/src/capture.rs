//! Run-scoped capture buffers: the log and the error slot.
//!
//! All observable output of a run funnels through here. The buffers are
//! fields of a per-run context (constructed fresh for every [`ScriptRun`])
//! rather than process-wide state, so nothing leaks between runs and
//! there is never anything to clear.
//!
//! [`ScriptRun`]: crate::ScriptRun

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// One captured log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Epoch milliseconds at append time.
    pub time: i64,
    /// The space-joined message.
    pub message: String,
}

/// The append-only log plus the single error slot for one run.
#[derive(Debug, Default)]
pub struct RunCapture {
    entries: Vec<LogEntry>,
    error: Option<String>,
}

impl RunCapture {
    /// Appends a log entry stamped with the current time.
    pub fn append(&mut self, message: String) {
        tracing::debug!(message = %message, "script log");
        self.entries.push(LogEntry {
            time: epoch_millis(),
            message,
        });
    }

    /// Encodes the log as a JSON array of `{time, message}` objects,
    /// in exact append order. Pure; callable any number of times.
    pub fn serialize_logs(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }

    /// Entries captured so far, in append order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Records the message of an uncaught failure. Overwrites any
    /// previous value: at most one survives per run.
    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    /// The captured failure message, if the run failed.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
