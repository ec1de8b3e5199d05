//! Signal bus contract: connection events and the boot-complete subscription.
//!
//! The subscription follows the bus connection, not the listener: it is bound
//! on every connect and dropped on every disconnect, even after the Validator
//! channel has been closed for good.

#![allow(missing_docs)]

use crate::core::config::BootSignalConfig;

/// Inbound notification from the signal bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Connected,
    Disconnected,
    Signal { interface: String, member: String },
}

impl BusEvent {
    #[must_use]
    pub fn signal(interface: impl Into<String>, member: impl Into<String>) -> Self {
        Self::Signal {
            interface: interface.into(),
            member: member.into(),
        }
    }
}

/// Namespace/name pair identifying one bus signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMatch {
    pub interface: String,
    pub member: String,
}

impl SignalMatch {
    #[must_use]
    pub fn matches(&self, interface: &str, member: &str) -> bool {
        self.interface == interface && self.member == member
    }
}

impl From<&BootSignalConfig> for SignalMatch {
    fn from(config: &BootSignalConfig) -> Self {
        Self {
            interface: config.interface.clone(),
            member: config.member.clone(),
        }
    }
}

/// Whether this component is currently subscribed to its bus signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalBinding {
    bound: bool,
    signals: Vec<SignalMatch>,
}

impl SignalBinding {
    #[must_use]
    pub const fn new(signals: Vec<SignalMatch>) -> Self {
        Self {
            bound: false,
            signals,
        }
    }

    /// Subscribe. Returns `false` when already bound.
    pub fn bind(&mut self) -> bool {
        !std::mem::replace(&mut self.bound, true)
    }

    /// Unsubscribe. Returns `false` when not bound.
    pub fn unbind(&mut self) -> bool {
        std::mem::replace(&mut self.bound, false)
    }

    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.bound
    }

    /// True only while bound and only for a subscribed signal.
    #[must_use]
    pub fn accepts(&self, interface: &str, member: &str) -> bool {
        self.bound
            && self
                .signals
                .iter()
                .any(|signal| signal.matches(interface, member))
    }
}
