//! Where classified failures and statement traces are reported.
//!
//! The executor never calls `tracing` directly. It goes through the [`DiagnosticsSink`] injected
//! into its [`Database`](crate::Database), which defaults to [`TracingSink`].

use std::fmt;
use std::sync::{LazyLock, Mutex};

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Needs an operator: the database is unreachable.
    High,
    /// Debug trace: statement text, unclassified failures.
    Low,
}

pub trait DiagnosticsSink: Send + Sync {
    /// Whether a message of this severity would be kept. Checked before the message is formatted.
    fn enabled(&self, severity: Severity) -> bool;

    fn record(&self, severity: Severity, message: &str);
}

/// Forwards to `tracing`: `High` as `error!`, `Low` as `debug!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn enabled(&self, severity: Severity) -> bool {
        match severity {
            Severity::High => tracing::enabled!(tracing::Level::ERROR),
            Severity::Low => tracing::enabled!(tracing::Level::DEBUG),
        }
    }

    fn record(&self, severity: Severity, message: &str) {
        match severity {
            Severity::High => tracing::error!(target: "sql_access", "{message}"),
            Severity::Low => tracing::debug!(target: "sql_access", "{message}"),
        }
    }
}

/// Keeps every message in memory. Useful for asserting on diagnostics in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<(Severity, String)> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages recorded at `severity`.
    #[must_use]
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, message)| message)
            .collect()
    }
}

impl DiagnosticsSink for MemorySink {
    fn enabled(&self, _severity: Severity) -> bool {
        true
    }

    fn record(&self, severity: Severity, message: &str) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push((severity, message.to_string()));
    }
}

pub(crate) fn emit(sink: &dyn DiagnosticsSink, severity: Severity, message: fmt::Arguments<'_>) {
    if sink.enabled(severity) {
        sink.record(severity, &message.to_string());
    }
}

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s{2,}").ok());

/// Collapse runs of whitespace so multi-line statements trace on one line.
pub(crate) fn normalize_sql(text: &str) -> String {
    let single_line = text.replace(['\n', '\r', '\t'], " ");
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(single_line.trim(), " ").into_owned(),
        None => single_line.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_statement_layout() {
        let sql = "SELECT id,\n       title\n  FROM book\n WHERE title = ?";
        assert_eq!(normalize_sql(sql), "SELECT id, title FROM book WHERE title = ?");
    }

    #[test]
    fn memory_sink_keeps_order_and_severity() {
        let sink = MemorySink::new();
        emit(&sink, Severity::Low, format_args!("first {}", 1));
        emit(&sink, Severity::High, format_args!("second"));
        assert_eq!(sink.messages(Severity::Low), vec!["first 1".to_string()]);
        assert_eq!(sink.entries().len(), 2);
    }
}
