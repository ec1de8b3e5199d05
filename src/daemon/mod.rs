//! Daemon subsystem: readiness loop, listener lifecycle, escalation, bus
//! subscription, signal handling.

pub mod bus;
pub mod escalation;
pub mod listener;
pub mod loop_main;
pub mod reactor;
#[cfg(feature = "daemon")]
pub mod signals;

pub use listener::{ListenerState, ValidatorListener};
pub use loop_main::ListenerDaemon;
