//! JSONL log writer.
//!
//! One JSON object per line: `ts`, `level`, `component`, `message`. Writes are
//! best-effort; a failing sink never takes the listener down with it.

#![allow(missing_docs)]

use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LogLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub ts: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
}

enum Sink {
    Writer(Box<dyn Write>),
    Memory(Rc<RefCell<Vec<LogRecord>>>),
}

struct Shared {
    min_level: LogLevel,
    sink: RefCell<Sink>,
}

/// Cheaply clonable logger handle. Single-threaded by construction: every
/// caller lives on the event-loop thread.
#[derive(Clone)]
pub struct Logger {
    shared: Rc<Shared>,
    component: &'static str,
}

/// Read side of a capturing logger.
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Rc<RefCell<Vec<LogRecord>>>,
}

impl LogCapture {
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    /// Records at `level` whose message contains `needle`.
    #[must_use]
    pub fn count(&self, level: LogLevel, needle: &str) -> usize {
        self.records
            .borrow()
            .iter()
            .filter(|record| record.level == level && record.message.contains(needle))
            .count()
    }
}

impl Logger {
    fn with_sink(min_level: LogLevel, sink: Sink) -> Self {
        Self {
            shared: Rc::new(Shared {
                min_level,
                sink: RefCell::new(sink),
            }),
            component: "vlisten",
        }
    }

    #[must_use]
    pub fn new(writer: Box<dyn Write>, min_level: LogLevel) -> Self {
        Self::with_sink(min_level, Sink::Writer(writer))
    }

    #[must_use]
    pub fn stderr(min_level: LogLevel) -> Self {
        Self::new(Box::new(io::stderr()), min_level)
    }

    /// Append to `path`, falling back to stderr when the file cannot be opened.
    #[must_use]
    pub fn open(path: &Path, min_level: LogLevel) -> Self {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self::new(Box::new(file), min_level),
            Err(err) => {
                let logger = Self::stderr(min_level);
                logger.warning(format!(
                    "log file {} unavailable ({err}); logging to stderr",
                    path.display()
                ));
                logger
            }
        }
    }

    /// In-memory logger for tests and dry runs.
    #[must_use]
    pub fn capture(min_level: LogLevel) -> (Self, LogCapture) {
        let capture = LogCapture::default();
        let logger = Self::with_sink(min_level, Sink::Memory(Rc::clone(&capture.records)));
        (logger, capture)
    }

    /// Same sink, different component label.
    #[must_use]
    pub fn for_component(&self, component: &'static str) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            component,
        }
    }

    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.shared.min_level
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.enabled(level) {
            return;
        }
        let record = LogRecord {
            ts: Utc::now(),
            level,
            component: self.component.to_string(),
            message: message.into(),
        };
        match &mut *self.shared.sink.borrow_mut() {
            Sink::Memory(records) => records.borrow_mut().push(record),
            Sink::Writer(writer) => {
                if let Ok(line) = serde_json::to_string(&record) {
                    let _ = writeln!(writer, "{line}");
                    let _ = writer.flush();
                }
            }
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .field("min_level", &self.shared.min_level)
            .finish_non_exhaustive()
    }
}
