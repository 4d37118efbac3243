// SPDX-License-Identifier: MPL-2.0

use crate::{addr::NetlinkSocketAddr, prelude::*};

/// The system calls a [`NetlinkSocket`] makes on its descriptor.
///
/// [`NetlinkFd`] is the real implementation. Other implementations wrap
/// descriptors owned elsewhere or replay a scripted conversation in tests.
///
/// [`NetlinkSocket`]: super::NetlinkSocket
/// [`NetlinkFd`]: super::NetlinkFd
pub trait RawNetlinkSocket {
    /// Binds the socket to a local address.
    fn bind(&self, addr: &NetlinkSocketAddr) -> Result<()>;

    /// Sends one datagram and returns the number of bytes written.
    fn send_to(&self, buf: &[u8], dst: &NetlinkSocketAddr) -> Result<usize>;

    /// Receives one datagram into `buf`.
    ///
    /// Like `recvmsg` with `MSG_TRUNC`, the returned length is the full length
    /// of the datagram, which exceeds `buf.len()` if the datagram was truncated.
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, NetlinkSocketAddr)>;

    /// Returns the address the socket is bound to.
    fn local_addr(&self) -> Result<NetlinkSocketAddr>;
}

impl<S: RawNetlinkSocket + ?Sized> RawNetlinkSocket for Box<S> {
    fn bind(&self, addr: &NetlinkSocketAddr) -> Result<()> {
        (**self).bind(addr)
    }

    fn send_to(&self, buf: &[u8], dst: &NetlinkSocketAddr) -> Result<usize> {
        (**self).send_to(buf, dst)
    }

    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, NetlinkSocketAddr)> {
        (**self).recv_from(buf)
    }

    fn local_addr(&self) -> Result<NetlinkSocketAddr> {
        (**self).local_addr()
    }
}
