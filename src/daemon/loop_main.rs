//! Host loop: owns the reactor and the listener and feeds them events.
//!
//! Every entry point (bus events, readiness, activation, shutdown) runs on
//! this one thread, in the order the loop reaches it.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::time::Duration;

use super::bus::BusEvent;
use super::escalation::Broadcaster;
use super::listener::{ListenerState, ValidatorListener};
use super::reactor::Reactor;
use crate::channel::Binder;
use crate::core::config::{BootSignalConfig, Config};
use crate::core::errors::{Result, VlError};
use crate::logger::Logger;

#[derive(Debug)]
pub struct ListenerDaemon {
    reactor: Reactor,
    listener: ValidatorListener,
    pending: VecDeque<BusEvent>,
    boot_signal: BootSignalConfig,
    poll_interval: Duration,
    log: Logger,
}

impl ListenerDaemon {
    #[must_use]
    pub fn new(config: &Config, broadcaster: Box<dyn Broadcaster>, log: &Logger) -> Self {
        Self {
            reactor: Reactor::new(),
            listener: ValidatorListener::new(config, broadcaster, log),
            pending: VecDeque::new(),
            boot_signal: config.boot_signal.clone(),
            poll_interval: config.daemon.poll_interval(),
            log: log.for_component("daemon"),
        }
    }

    /// Load the listener and try to open the channel. A failed open is not
    /// fatal to the daemon; the listener just stays inactive.
    pub fn start(&mut self, binder: &dyn Binder) -> ListenerState {
        self.log.debug("validatorlistener loaded");
        if self.listener.activate(binder, &mut self.reactor).is_err() {
            self.log.warning("continuing without Validator listener for this boot");
        }
        self.listener.state()
    }

    /// Queue a bus event for the next turn.
    pub fn post(&mut self, event: BusEvent) {
        self.pending.push_back(event);
    }

    /// Queue the configured boot-complete signal.
    pub fn post_boot_done(&mut self) {
        let event = BusEvent::signal(&self.boot_signal.interface, &self.boot_signal.member);
        self.post(event);
    }

    /// One loop iteration: deliver queued bus events, wait up to `timeout`
    /// for readiness, dispatch it. Returns the number of readiness events
    /// dispatched.
    pub fn turn(&mut self, timeout: Duration) -> Result<usize> {
        while let Some(event) = self.pending.pop_front() {
            self.listener.on_bus_event(&event, &mut self.reactor);
        }

        let ready = self.reactor.poll(timeout).map_err(|err| VlError::Runtime {
            details: format!("poll failed: {err}"),
        })?;

        let mut dispatched = 0;
        for (watch, condition) in ready {
            if !self.reactor.is_registered(watch) {
                continue;
            }
            let flow = self.listener.on_ready(watch, condition, &mut self.reactor);
            self.reactor.settle(watch, flow);
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Run until a shutdown signal arrives. The bus counts as connected for
    /// the lifetime of the loop.
    #[cfg(feature = "daemon")]
    pub fn run(&mut self, signals: &super::signals::SignalFlags) -> Result<()> {
        self.post(BusEvent::Connected);
        while !signals.shutdown_requested() {
            if signals.take_boot_done() {
                self.post_boot_done();
            }
            self.turn(self.poll_interval)?;
        }
        self.shutdown();
        Ok(())
    }

    /// Disconnect from the bus and release the channel if still open.
    pub fn shutdown(&mut self) {
        self.listener.on_bus_event(&BusEvent::Disconnected, &mut self.reactor);
        self.listener.stop(&mut self.reactor);
        self.log.debug("validatorlistener unloaded");
    }

    #[must_use]
    pub const fn listener(&self) -> &ValidatorListener {
        &self.listener
    }

    #[must_use]
    pub const fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
