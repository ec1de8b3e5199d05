//! Single-threaded readiness loop built on poll(2).
//!
//! Callers register a descriptor, wait for readiness with [`Reactor::poll`],
//! dispatch each ready watch to its owner and hand the owner's [`Flow`]
//! verdict back through [`Reactor::settle`]. Nothing here spawns threads or
//! blocks outside the single `poll` call.

#![allow(missing_docs)]

use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, poll};

/// Handle returned by [`Reactor::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u64);

/// What a readiness event reported for one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoCondition {
    pub readable: bool,
    pub error: bool,
    pub hangup: bool,
}

impl IoCondition {
    pub const READABLE: Self = Self {
        readable: true,
        error: false,
        hangup: false,
    };
    pub const ERROR: Self = Self {
        readable: false,
        error: true,
        hangup: false,
    };
    pub const HANGUP: Self = Self {
        readable: false,
        error: false,
        hangup: true,
    };

    /// Error or hangup: the descriptor will not recover.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        self.error || self.hangup
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        !self.readable && !self.error && !self.hangup
    }

    fn from_revents(revents: PollFlags) -> Self {
        Self {
            readable: revents.intersects(PollFlags::POLLIN | PollFlags::POLLPRI),
            error: revents.intersects(PollFlags::POLLERR | PollFlags::POLLNVAL),
            hangup: revents.contains(PollFlags::POLLHUP),
        }
    }
}

/// Handler verdict: keep the registration or drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

struct Watch {
    id: WatchId,
    // The reactor polls its own duplicate so a registration never borrows
    // the owner's socket; owners unregister before closing theirs.
    fd: OwnedFd,
}

#[derive(Default)]
pub struct Reactor {
    next_id: u64,
    watches: Vec<Watch>,
}

impl Reactor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `fd` for input, errors and hangups.
    pub fn register(&mut self, fd: BorrowedFd<'_>) -> io::Result<WatchId> {
        let fd = fd.try_clone_to_owned()?;
        self.next_id += 1;
        let id = WatchId(self.next_id);
        self.watches.push(Watch { id, fd });
        Ok(id)
    }

    /// Drop a registration. Returns whether it was still registered.
    pub fn unregister(&mut self, id: WatchId) -> bool {
        let before = self.watches.len();
        self.watches.retain(|watch| watch.id != id);
        self.watches.len() != before
    }

    #[must_use]
    pub fn is_registered(&self, id: WatchId) -> bool {
        self.watches.iter().any(|watch| watch.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Apply a handler verdict for `id`.
    pub fn settle(&mut self, id: WatchId, flow: Flow) {
        if flow == Flow::Stop {
            self.unregister(id);
        }
    }

    /// Wait up to `timeout` for readiness. An interrupted wait returns no
    /// events so the caller can look at signal flags.
    pub fn poll(&mut self, timeout: Duration) -> io::Result<Vec<(WatchId, IoCondition)>> {
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds: Vec<PollFd<'_>> = self
            .watches
            .iter()
            .map(|watch| PollFd::new(watch.fd.as_fd(), PollFlags::POLLIN))
            .collect();

        match poll(&mut fds, millis) {
            Ok(0) | Err(Errno::EINTR) => return Ok(Vec::new()),
            Ok(_) => {}
            Err(errno) => return Err(io::Error::from(errno)),
        }

        Ok(self
            .watches
            .iter()
            .zip(&fds)
            .filter_map(|(watch, pfd)| {
                let condition = IoCondition::from_revents(pfd.revents()?);
                (!condition.is_empty()).then_some((watch.id, condition))
            })
            .collect())
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("watches", &self.watches.iter().map(|w| w.id).collect::<Vec<_>>())
            .finish()
    }
}
