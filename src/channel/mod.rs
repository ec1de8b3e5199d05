//! Kernel notification channel: the socket a Validator report arrives on.
//!
//! [`NotificationChannel`] is either fully open (socket bound, receive buffer
//! allocated) or does not exist; there is no half-open value to hold on to.
//! Opening goes through a [`Binder`] so the netlink socket can be swapped for
//! a local datagram socket in tests.

pub mod netlink;

pub use netlink::NetlinkBinder;

use std::io;
use std::os::fd::{AsFd, BorrowedFd};

use crate::core::config::ChannelConfig;
use crate::core::errors::{Result, VlError};
use crate::protocol::nlmsg;

/// Address of the sender of one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SenderAddr {
    /// Port id of the sender; 0 for the kernel.
    pub pid: u32,
    /// Multicast groups the datagram was sent to.
    pub groups: u32,
}

/// A connectionless socket that yields whole datagrams.
pub trait Transport: AsFd {
    /// Read one datagram into `buf`, returning its length and sender.
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<(usize, SenderAddr)>;
}

/// Creates and binds the socket behind a [`NotificationChannel`].
///
/// Implementations must release whatever they acquired before returning an
/// error.
pub trait Binder {
    /// Open a transport for `config`. Errors are `VlError::ChannelOpen`.
    fn bind(&self, config: &ChannelConfig) -> Result<Box<dyn Transport>>;
}

/// One received datagram, borrowed from the channel's receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNotification<'a> {
    /// The whole datagram, header included.
    pub datagram: &'a [u8],
    /// Who sent it.
    pub sender: SenderAddr,
}

impl<'a> RawNotification<'a> {
    /// The report text bytes carried after the netlink header.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        nlmsg::payload(self.datagram)
    }
}

/// An open Validator channel.
pub struct NotificationChannel {
    transport: Box<dyn Transport>,
    group_mask: u32,
    buffer: Box<[u8]>,
}

impl NotificationChannel {
    /// Create and bind the socket, then size the receive buffer once.
    pub fn open(binder: &dyn Binder, config: &ChannelConfig) -> Result<Self> {
        let transport = binder.bind(config)?;
        Ok(Self {
            transport,
            group_mask: config.group_mask,
            buffer: vec![0u8; nlmsg::nlmsg_space(config.max_payload)].into_boxed_slice(),
        })
    }

    /// Read exactly one datagram. A failed read leaves the channel open.
    pub fn receive(&mut self) -> Result<RawNotification<'_>> {
        let (len, sender) = self
            .transport
            .recv_datagram(&mut self.buffer)
            .map_err(|source| VlError::ChannelReceive { source })?;
        Ok(RawNotification {
            datagram: &self.buffer[..len.min(self.buffer.len())],
            sender,
        })
    }

    /// Multicast groups the socket was bound to.
    #[must_use]
    pub const fn group_mask(&self) -> u32 {
        self.group_mask
    }

    /// Size of the reusable receive buffer (`NLMSG_SPACE(max_payload)`).
    #[must_use]
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Release the socket. Consuming `self` makes a second close impossible.
    pub fn close(self) {
        drop(self);
    }
}

impl AsFd for NotificationChannel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.transport.as_fd()
    }
}

impl std::fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("fd", &self.transport.as_fd())
            .field("group_mask", &self.group_mask)
            .field("buffer_capacity", &self.buffer.len())
            .finish()
    }
}
