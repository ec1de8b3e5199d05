//! Validator listener lifecycle: `Inactive -> Listening -> Stopped`.
//!
//! The listener is the only owner of the notification channel and its
//! reactor registration. Stopping is one-way; once the boot window closes the
//! channel is never reopened in this process.

#![allow(missing_docs)]

use std::os::fd::AsFd;

use serde::Serialize;

use super::bus::{BusEvent, SignalBinding, SignalMatch};
use super::escalation::{Broadcaster, EscalationEmitter};
use super::reactor::{Flow, IoCondition, Reactor, WatchId};
use crate::channel::{Binder, NotificationChannel};
use crate::core::config::{ChannelConfig, Config};
use crate::core::errors::{OpenStage, Result, VlError};
use crate::logger::Logger;
use crate::protocol::parse_payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerState {
    Inactive,
    Listening,
    Stopped,
}

/// Open channel together with the registration watching it.
#[derive(Debug)]
struct Listening {
    channel: NotificationChannel,
    watch: WatchId,
}

#[derive(Debug)]
pub struct ValidatorListener {
    channel_config: ChannelConfig,
    state: ListenerState,
    active: Option<Listening>,
    subscription: SignalBinding,
    emitter: EscalationEmitter,
    log: Logger,
}

impl ValidatorListener {
    #[must_use]
    pub fn new(config: &Config, broadcaster: Box<dyn Broadcaster>, log: &Logger) -> Self {
        Self {
            channel_config: config.channel.clone(),
            state: ListenerState::Inactive,
            active: None,
            subscription: SignalBinding::new(vec![SignalMatch::from(&config.boot_signal)]),
            emitter: EscalationEmitter::new(broadcaster, log),
            log: log.for_component("validatorlistener"),
        }
    }

    #[must_use]
    pub const fn state(&self) -> ListenerState {
        self.state
    }

    /// Registration of the open channel, if listening.
    #[must_use]
    pub fn watch(&self) -> Option<WatchId> {
        self.active.as_ref().map(|listening| listening.watch)
    }

    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.subscription.is_bound()
    }

    /// Open the channel and register it with `reactor`.
    ///
    /// Runs once. On failure the listener stays `Inactive` for good: the
    /// error is logged and returned, and nothing retries it.
    pub fn activate(&mut self, binder: &dyn Binder, reactor: &mut Reactor) -> Result<()> {
        if self.state != ListenerState::Inactive {
            let state = self.state;
            self.log.debug(format!("activation ignored in state {state:?}"));
            return Ok(());
        }

        match Self::open_and_register(binder, &self.channel_config, reactor) {
            Ok(listening) => {
                self.active = Some(listening);
                self.state = ListenerState::Listening;
                self.log.info("listening to Validator");
                Ok(())
            }
            Err(err) => {
                self.log.error(format!("Validator {err}"));
                self.log.critical("failed to start listening to Validator");
                Err(err)
            }
        }
    }

    fn open_and_register(
        binder: &dyn Binder,
        config: &ChannelConfig,
        reactor: &mut Reactor,
    ) -> Result<Listening> {
        let channel = NotificationChannel::open(binder, config)?;
        // On failure `channel` drops here, closing the socket.
        let watch = reactor
            .register(channel.as_fd())
            .map_err(|source| VlError::open(OpenStage::Register, source))?;
        Ok(Listening { channel, watch })
    }

    /// Readiness handler for the channel registration.
    ///
    /// Processes at most one datagram. Returns [`Flow::Stop`] exactly when
    /// the listener is (or just became) stopped.
    pub fn on_ready(
        &mut self,
        watch: WatchId,
        condition: IoCondition,
        reactor: &mut Reactor,
    ) -> Flow {
        self.log.debug("Activity on Validator socket");

        let Some(listening) = self.active.as_mut().filter(|l| l.watch == watch) else {
            return Flow::Stop;
        };

        if condition.readable {
            let received = listening
                .channel
                .receive()
                .map(|raw| (raw.datagram.is_empty(), parse_payload(raw.payload())));
            match received {
                Err(err) => self.log.error(format!("Error receiving Validator message: {err}")),
                Ok((true, _)) => self.log.debug("empty read on Validator socket"),
                Ok((false, violation)) => self.emitter.escalate(violation),
            }
        }

        if condition.is_fatal() {
            self.log.error("ERR or HUP on Validator socket");
            self.stop(reactor);
            return Flow::Stop;
        }
        Flow::Continue
    }

    /// Unregister, then close. A no-op unless listening.
    pub fn stop(&mut self, reactor: &mut Reactor) {
        let Some(Listening { channel, watch }) = self.active.take() else {
            return;
        };
        self.log.debug("closing Validator socket");
        reactor.unregister(watch);
        channel.close();
        self.state = ListenerState::Stopped;
    }

    /// Bus connection and signal handling. Only the boot-complete signal
    /// touches the listener state.
    pub fn on_bus_event(&mut self, event: &BusEvent, reactor: &mut Reactor) {
        match event {
            BusEvent::Connected => {
                self.log.debug("validatorlistener: bus connected");
                self.subscription.bind();
            }
            BusEvent::Disconnected => {
                self.log.debug("validatorlistener: bus disconnected");
                self.subscription.unbind();
            }
            BusEvent::Signal { interface, member } => {
                if self.subscription.accepts(interface, member) {
                    self.log.debug(format!("{member}; not listening to Validator"));
                    self.stop(reactor);
                }
            }
        }
    }
}
