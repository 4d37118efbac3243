// SPDX-License-Identifier: MPL-2.0

use std::{
    io::IoSliceMut,
    os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd},
    time::Duration,
};

use nix::sys::{
    socket::{self, MsgFlags, NetlinkAddr, sockopt},
    time::TimeVal,
};

use super::RawNetlinkSocket;
use crate::{
    addr::{NetlinkProtocolId, NetlinkSocketAddr},
    prelude::*,
};

/// A kernel netlink socket descriptor.
///
/// The descriptor is closed when the value is dropped.
#[derive(Debug)]
pub struct NetlinkFd {
    fd: OwnedFd,
}

impl NetlinkFd {
    /// Opens an unbound `AF_NETLINK` raw socket.
    pub fn open(protocol: NetlinkProtocolId) -> Result<Self> {
        let Ok(protocol) = i32::try_from(protocol) else {
            return_errno_with_message!(Errno::EINVAL, "the protocol ID is out of range");
        };

        // `nix::sys::socket::socket` only accepts the protocols it knows,
        // so the descriptor is created directly.
        //
        // SAFETY: `socket` takes no pointers and has no memory-safety preconditions.
        let raw_fd = unsafe {
            libc::socket(
                libc::AF_NETLINK,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                protocol,
            )
        };
        if raw_fd < 0 {
            return Err(nix::errno::Errno::last().into());
        }

        // SAFETY: `raw_fd` is a valid descriptor that was just created and is owned by nothing else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw_fd) };

        Ok(Self { fd })
    }

    /// Bounds every blocking receive by `timeout`.
    ///
    /// A zero timeout makes receives block forever.
    pub fn set_recv_timeout(&self, timeout: Duration) -> Result<()> {
        let timeval = TimeVal::new(timeout.as_secs() as _, timeout.subsec_micros() as _);
        socket::setsockopt(&self.fd, sockopt::ReceiveTimeout, &timeval)?;
        Ok(())
    }
}

impl From<OwnedFd> for NetlinkFd {
    fn from(fd: OwnedFd) -> Self {
        Self { fd }
    }
}

impl From<NetlinkFd> for OwnedFd {
    fn from(value: NetlinkFd) -> Self {
        value.fd
    }
}

impl AsFd for NetlinkFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for NetlinkFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl RawNetlinkSocket for NetlinkFd {
    fn bind(&self, addr: &NetlinkSocketAddr) -> Result<()> {
        let addr = NetlinkAddr::from(*addr);
        socket::bind(self.as_raw_fd(), &addr)?;
        Ok(())
    }

    fn send_to(&self, buf: &[u8], dst: &NetlinkSocketAddr) -> Result<usize> {
        let dst = NetlinkAddr::from(*dst);
        let sent_len = socket::sendto(self.as_raw_fd(), buf, &dst, MsgFlags::empty())?;
        Ok(sent_len)
    }

    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, NetlinkSocketAddr)> {
        let mut iov = [IoSliceMut::new(buf)];
        let message = socket::recvmsg::<NetlinkAddr>(
            self.as_raw_fd(),
            &mut iov,
            None,
            MsgFlags::MSG_TRUNC,
        )?;

        // Netlink always reports the sender. Treat a missing one as the kernel.
        let src = message
            .address
            .map(NetlinkSocketAddr::from)
            .unwrap_or_else(NetlinkSocketAddr::kernel);

        Ok((message.bytes, src))
    }

    fn local_addr(&self) -> Result<NetlinkSocketAddr> {
        let addr = socket::getsockname::<NetlinkAddr>(self.as_raw_fd())?;
        Ok(addr.into())
    }
}
