//! Validator wire protocol: netlink framing and report text parsing.

pub mod nlmsg;
pub mod parser;

pub use parser::{ParsedViolation, UNKNOWN, parse_payload, parse_report};
