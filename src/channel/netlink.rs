//! Netlink binding for the Validator channel.
//!
//! The socket is `PF_NETLINK`/`SOCK_RAW` with the Validator protocol number,
//! bound to this process's pid and the integrity-report group mask. Both
//! constants come from configuration; the defaults are placeholders pending
//! a kernel header that defines them.

#![allow(missing_docs)]

use crate::channel::{Binder, Transport};
use crate::core::config::ChannelConfig;
use crate::core::errors::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct NetlinkBinder;

#[cfg(target_os = "linux")]
mod imp {
    use std::io;
    use std::os::fd::{AsFd, AsRawFd, BorrowedFd};

    use nix::sys::socket::{NetlinkAddr, bind, recvfrom};
    use socket2::{Domain, Protocol, Socket, Type};

    use crate::channel::{SenderAddr, Transport};
    use crate::core::config::ChannelConfig;
    use crate::core::errors::{OpenStage, Result, VlError};

    pub struct NetlinkSocket {
        socket: Socket,
    }

    impl AsFd for NetlinkSocket {
        fn as_fd(&self) -> BorrowedFd<'_> {
            self.socket.as_fd()
        }
    }

    impl Transport for NetlinkSocket {
        fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<(usize, SenderAddr)> {
            let (len, addr) = recvfrom::<NetlinkAddr>(self.socket.as_raw_fd(), buf)?;
            let sender = addr.map_or_else(SenderAddr::default, |addr| SenderAddr {
                pid: addr.pid(),
                groups: addr.groups(),
            });
            Ok((len, sender))
        }
    }

    pub fn open(config: &ChannelConfig) -> Result<NetlinkSocket> {
        let socket = Socket::new(
            Domain::from(libc::AF_NETLINK),
            Type::RAW,
            Some(Protocol::from(config.protocol)),
        )
        .map_err(|source| VlError::open(OpenStage::Socket, source))?;

        // Dropping `socket` on the error path closes it.
        let local = NetlinkAddr::new(std::process::id(), config.group_mask);
        bind(socket.as_raw_fd(), &local)
            .map_err(|errno| VlError::open(OpenStage::Bind, io::Error::from(errno)))?;

        Ok(NetlinkSocket { socket })
    }
}

impl Binder for NetlinkBinder {
    #[cfg(target_os = "linux")]
    fn bind(&self, config: &ChannelConfig) -> Result<Box<dyn Transport>> {
        Ok(Box::new(imp::open(config)?))
    }

    #[cfg(not(target_os = "linux"))]
    fn bind(&self, _config: &ChannelConfig) -> Result<Box<dyn Transport>> {
        Err(crate::core::errors::VlError::UnsupportedPlatform {
            details: "Validator reports arrive over Linux netlink".to_string(),
        })
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::core::errors::{OpenStage, VlError};

    #[test]
    fn out_of_range_protocol_fails_at_socket_stage() {
        let config = ChannelConfig {
            protocol: 4096,
            ..ChannelConfig::default()
        };
        let err = NetlinkBinder.bind(&config).err().expect("kernel rejects protocol");
        assert!(
            matches!(
                err,
                VlError::ChannelOpen {
                    stage: OpenStage::Socket,
                    ..
                }
            ),
            "unexpected error: {err}"
        );
    }
}
