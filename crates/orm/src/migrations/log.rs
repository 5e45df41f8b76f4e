//! Operator-facing migration log
//!
//! One line per event: `[YYYY-MM-DD HH:MM:SS] - <message>`.

use chrono::{DateTime, Local};
use std::sync::Mutex;

/// Sink receiving migration progress lines
pub trait MigrationLog: Send + Sync {
    fn log(&self, message: &str);
}

/// Render a log line for `at`
pub fn format_line(at: DateTime<Local>, message: &str) -> String {
    format!("[{}] - {}", at.format("%Y-%m-%d %H:%M:%S"), message)
}

/// Prints lines to stdout and mirrors them to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLog;

impl MigrationLog for ConsoleLog {
    fn log(&self, message: &str) {
        println!("{}", format_line(Local::now(), message));
        tracing::debug!(target: "strata::migrate", "{}", message);
    }
}

/// Keeps messages in memory
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages logged so far, without timestamps
    pub fn messages(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of messages starting with `prefix`
    pub fn count_starting_with(&self, prefix: &str) -> usize {
        self.messages().iter().filter(|m| m.starts_with(prefix)).count()
    }
}

impl MigrationLog for MemoryLog {
    fn log(&self, message: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push(message.to_string());
    }
}
