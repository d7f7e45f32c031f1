//! Audit logging of masking activity.
//!
//! Entries name the binding and count its matches; secret values never
//! reach the log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::masking::BindingStats;

/// An audit log entry.
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// Binding name of the secret.
    pub secret: String,
    /// Dialect the secret was matched in.
    pub dialect: String,
    /// Number of occurrences replaced.
    pub masked: usize,
}

impl AuditEntry {
    pub fn new(stats: &BindingStats) -> Self {
        Self {
            timestamp: Utc::now(),
            secret: stats.name.clone(),
            dialect: stats.dialect.id().to_string(),
            masked: stats.masked,
        }
    }
}

/// Audit logger for writing entries to a file.
pub struct AuditLogger {
    file: File,
}

impl AuditLogger {
    /// Open or create an audit log file.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    /// Write an audit entry to the log.
    pub fn log(&mut self, entry: &AuditEntry) -> std::io::Result<()> {
        let json = serde_json::to_string(entry)?;
        writeln!(self.file, "{}", json)?;
        self.file.flush()
    }

    /// Log one entry per binding.
    pub fn log_stats(&mut self, stats: &[BindingStats]) -> std::io::Result<()> {
        for s in stats {
            self.log(&AuditEntry::new(s))?;
        }
        Ok(())
    }
}
