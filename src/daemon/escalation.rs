//! Escalation to the fail-safe malfunction state.
//!
//! A parsed violation becomes one `EnterMalf` broadcast with the security
//! reason, the offending component as the short identifier and the details as
//! a NUL-terminated extra block whose length travels with it.
//!
//! The strings handed to [`EscalationEmitter::escalate`] are leaked on
//! purpose. The broadcast puts the system into malfunction mode for the rest
//! of this process incarnation, so nothing would ever reclaim them anyway and
//! the broadcast can borrow them for `'static`.

#![allow(missing_docs)]

use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use chrono::Utc;
use serde::Serialize;

use crate::core::errors::{Result, VlError};
use crate::logger::Logger;
use crate::protocol::ParsedViolation;

/// Reason carried by a malfunction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MalfReason {
    Security,
}

/// "Enter malfunction" message. Details travel as the extra block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnterMalf {
    pub reason: MalfReason,
    pub component: &'static str,
}

/// Process-wide broadcast of internal messages.
pub trait Broadcaster {
    /// Send `message` to every other consumer, followed by `extra`.
    fn broadcast_with_extra(&mut self, message: &EnterMalf, extra: &[u8]) -> Result<()>;
}

/// Text of an extra block without its terminating NUL.
#[must_use]
pub fn extra_text(extra: &[u8]) -> String {
    let body = extra.strip_suffix(&[0u8]).unwrap_or(extra);
    String::from_utf8_lossy(body).into_owned()
}

#[derive(Serialize)]
struct MalfLine<'a> {
    ts: String,
    kind: &'static str,
    reason: MalfReason,
    component: &'a str,
    details: String,
    extra_len: usize,
}

/// Broadcaster that appends one JSON object per message to a writer.
pub struct JsonlBroadcaster {
    out: Box<dyn Write>,
}

impl JsonlBroadcaster {
    #[must_use]
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| VlError::io(path, source))?;
        Ok(Self::new(Box::new(file)))
    }
}

impl Broadcaster for JsonlBroadcaster {
    fn broadcast_with_extra(&mut self, message: &EnterMalf, extra: &[u8]) -> Result<()> {
        let line = serde_json::to_string(&MalfLine {
            ts: Utc::now().to_rfc3339(),
            kind: "enter_malf",
            reason: message.reason,
            component: message.component,
            details: extra_text(extra),
            extra_len: extra.len(),
        })?;
        writeln!(self.out, "{line}")
            .and_then(|()| self.out.flush())
            .map_err(|source| VlError::Runtime {
                details: format!("malfunction broadcast write failed: {source}"),
            })
    }
}

/// One broadcast as seen by a [`RecordingBroadcaster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMalf {
    pub reason: MalfReason,
    pub component: String,
    pub extra: Vec<u8>,
}

impl RecordedMalf {
    #[must_use]
    pub fn details(&self) -> String {
        extra_text(&self.extra)
    }
}

/// In-memory broadcaster; clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingBroadcaster {
    sent: Rc<RefCell<Vec<RecordedMalf>>>,
}

impl RecordingBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<RecordedMalf> {
        self.sent.borrow().clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast_with_extra(&mut self, message: &EnterMalf, extra: &[u8]) -> Result<()> {
        self.sent.borrow_mut().push(RecordedMalf {
            reason: message.reason,
            component: message.component.to_string(),
            extra: extra.to_vec(),
        });
        Ok(())
    }
}

/// Builds and sends the security malfunction request.
pub struct EscalationEmitter {
    broadcaster: Box<dyn Broadcaster>,
    log: Logger,
}

impl EscalationEmitter {
    #[must_use]
    pub fn new(broadcaster: Box<dyn Broadcaster>, log: &Logger) -> Self {
        Self {
            broadcaster,
            log: log.for_component("escalation"),
        }
    }

    /// Request malfunction mode for `violation`. Takes ownership of the
    /// strings and never gives them back.
    pub fn escalate(&mut self, violation: ParsedViolation) {
        let ParsedViolation { component, details } = violation;
        self.log.critical(format!("Security MALF: {component} {details}"));

        let mut extra = details.into_bytes();
        extra.push(0);
        let extra: &'static [u8] = extra.leak();
        let message = EnterMalf {
            reason: MalfReason::Security,
            component: component.leak(),
        };

        if let Err(err) = self.broadcaster.broadcast_with_extra(&message, extra) {
            self.log.error(format!("malfunction broadcast failed: {err}"));
        }
    }
}

impl std::fmt::Debug for EscalationEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;

    struct BrokenBroadcaster;

    impl Broadcaster for BrokenBroadcaster {
        fn broadcast_with_extra(&mut self, _message: &EnterMalf, _extra: &[u8]) -> Result<()> {
            Err(VlError::Runtime {
                details: "bus gone".to_string(),
            })
        }
    }

    #[test]
    fn escalate_sends_security_malf_with_terminated_details() {
        let (log, capture) = Logger::capture(LogLevel::Debug);
        let recorder = RecordingBroadcaster::new();
        let mut emitter = EscalationEmitter::new(Box::new(recorder.clone()), &log);

        emitter.escalate(ParsedViolation {
            component: "evil-binary".to_string(),
            details: "/usr/bin/evil-binary".to_string(),
        });

        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reason, MalfReason::Security);
        assert_eq!(sent[0].component, "evil-binary");
        assert_eq!(sent[0].extra.len(), "/usr/bin/evil-binary".len() + 1);
        assert_eq!(sent[0].extra.last(), Some(&0));
        assert_eq!(sent[0].details(), "/usr/bin/evil-binary");
        assert_eq!(
            capture.count(LogLevel::Critical, "Security MALF: evil-binary /usr/bin/evil-binary"),
            1
        );
    }

    #[test]
    fn broadcast_failure_is_logged_not_raised() {
        let (log, capture) = Logger::capture(LogLevel::Debug);
        let mut emitter = EscalationEmitter::new(Box::new(BrokenBroadcaster), &log);
        emitter.escalate(ParsedViolation {
            component: "(unknown)".to_string(),
            details: "(unknown)".to_string(),
        });
        assert_eq!(capture.count(LogLevel::Error, "bus gone"), 1);
    }

    #[test]
    fn jsonl_sink_records_message_and_extra_length() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("malf.jsonl");
        let mut sink = JsonlBroadcaster::open(&path).expect("open sink");
        sink.broadcast_with_extra(
            &EnterMalf {
                reason: MalfReason::Security,
                component: "evil",
            },
            b"/bin/evil\0",
        )
        .expect("broadcast");
        drop(sink);

        let line = std::fs::read_to_string(&path).expect("read sink");
        let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
        assert_eq!(value["kind"], "enter_malf");
        assert_eq!(value["reason"], "security");
        assert_eq!(value["component"], "evil");
        assert_eq!(value["details"], "/bin/evil");
        assert_eq!(value["extra_len"], 10);
    }
}
