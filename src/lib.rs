//! Boot-time Validator listener.
//!
//! Listens on a kernel netlink channel for integrity-violation reports while
//! the system boots, turns each report into a `(component, details)` pair and
//! asks the rest of the system to enter the security malfunction state. The
//! channel closes for good once the boot-complete signal arrives.

pub mod channel;
#[cfg(feature = "cli")]
pub mod cli_app;
pub mod core;
pub mod daemon;
pub mod logger;
pub mod protocol;
