//! POSIX signal flags for the foreground daemon.
//!
//! `SIGTERM`/`SIGINT` request shutdown. `SIGUSR1` stands in for the bus
//! delivering the boot-complete signal, so init scripts without a bus client
//! can still close the boot window.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1};
use signal_hook::flag;

use crate::core::errors::{Result, VlError};

#[derive(Debug, Clone, Default)]
pub struct SignalFlags {
    shutdown: Arc<AtomicBool>,
    boot_done: Arc<AtomicBool>,
}

impl SignalFlags {
    /// Install handlers for the daemon's signals.
    pub fn install() -> Result<Self> {
        let flags = Self::default();
        for (signal, target) in [
            (SIGTERM, &flags.shutdown),
            (SIGINT, &flags.shutdown),
            (SIGUSR1, &flags.boot_done),
        ] {
            flag::register(signal, Arc::clone(target)).map_err(|err| VlError::Runtime {
                details: format!("failed to install handler for signal {signal}: {err}"),
            })?;
        }
        Ok(flags)
    }

    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Consume a pending boot-complete notification.
    #[must_use]
    pub fn take_boot_done(&self) -> bool {
        self.boot_done.swap(false, Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
