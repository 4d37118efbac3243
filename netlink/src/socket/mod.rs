// SPDX-License-Identifier: MPL-2.0

//! The netlink transport.
//!
//! A [`NetlinkSocket`] owns one raw netlink socket and one scratch buffer.
//! It sends encoded requests, receives datagrams into the scratch buffer,
//! correlates ACKs with requests, and waits for segments of given types.
//!
//! The socket is either active or failed. It fails for good when it cannot
//! be opened or bound, or when it is closed. Every operation on a failed
//! socket returns `EBADF` without making a system call. Send and receive
//! errors are reported per call and leave the socket active.

use core::ops::Range;

pub use fd::NetlinkFd;
pub use raw::RawNetlinkSocket;

use crate::{
    addr::{GroupIdSet, NetlinkProtocolId, NetlinkSocketAddr, PortNum, protocol_name},
    config::NetlinkConfig,
    message::{CSegmentType, ErrorSegment, Message, NlBuffer, Segment, Segments},
    prelude::*,
};

mod fd;
mod raw;

/// The receive size used when waiting for ACKs, unless configured otherwise.
pub const DEFAULT_RECEIVE_SIZE: usize = 8192;

enum Inner<S> {
    Active(S),
    Failed,
}

impl<S> Inner<S> {
    fn active(&self) -> Result<&S> {
        match self {
            Inner::Active(raw) => Ok(raw),
            Inner::Failed => {
                return_errno_with_message!(Errno::EBADF, "the netlink socket has failed")
            }
        }
    }
}

/// A netlink socket that moves framed messages to and from the kernel.
pub struct NetlinkSocket<S: RawNetlinkSocket = NetlinkFd> {
    protocol: NetlinkProtocolId,
    inner: Inner<S>,
    last_seq: Option<u32>,
    receive_size: usize,
    receive_buffer: Vec<u8>,
}

impl NetlinkSocket<NetlinkFd> {
    /// Opens and binds a kernel netlink socket.
    ///
    /// Failures are logged and leave the socket failed. Check
    /// [`Self::is_failed`] before relying on it.
    pub fn open(config: &NetlinkConfig) -> Self {
        let protocol = config.protocol();

        let fd = match NetlinkFd::open(protocol) {
            Ok(fd) => fd,
            Err(err) => {
                error!(
                    "failed to open a netlink socket for {}: {}",
                    ProtocolDisplay(protocol),
                    err
                );
                return Self::new_failed(protocol);
            }
        };

        if let Some(timeout) = config.recv_timeout() {
            if let Err(err) = fd.set_recv_timeout(timeout) {
                error!("failed to set the netlink receive timeout: {}", err);
                return Self::new_failed(protocol);
            }
        }

        let local_addr = NetlinkSocketAddr::new(config.port(), config.groups());
        let mut socket = Self::from_raw(protocol, fd, &local_addr);
        socket.set_receive_size(config.max_receive_size());
        socket.reserve_receive_buffer(config.max_receive_size());
        socket
    }

    /// Opens a socket bound to `port` and subscribed to `groups`, without a receive timeout.
    pub fn new(protocol: NetlinkProtocolId, port: PortNum, groups: GroupIdSet) -> Self {
        let mut config = NetlinkConfig::new(protocol);
        config.set_port(port).set_groups(groups);
        Self::open(&config)
    }
}

impl<S: RawNetlinkSocket> NetlinkSocket<S> {
    /// Binds `raw` to `local_addr` and takes ownership of it.
    ///
    /// If binding fails, `raw` is dropped and the socket is failed.
    pub fn from_raw(protocol: NetlinkProtocolId, raw: S, local_addr: &NetlinkSocketAddr) -> Self {
        if let Err(err) = raw.bind(local_addr) {
            error!(
                "failed to bind a netlink socket for {} to port {} (groups {:#x}): {}",
                ProtocolDisplay(protocol),
                local_addr.port(),
                local_addr.groups().as_u32(),
                err
            );
            return Self::new_failed(protocol);
        }

        debug!(
            "netlink socket for {} bound to port {} (groups {:#x})",
            ProtocolDisplay(protocol),
            local_addr.port(),
            local_addr.groups().as_u32()
        );

        Self::with_inner(protocol, Inner::Active(raw))
    }

    /// Takes ownership of `raw`, which is already bound.
    ///
    /// No system call is made, so the socket keeps whatever port and groups
    /// `raw` was bound to.
    pub fn from_bound(protocol: NetlinkProtocolId, raw: S) -> Self {
        debug!(
            "adopted a bound netlink socket for {}",
            ProtocolDisplay(protocol)
        );
        Self::with_inner(protocol, Inner::Active(raw))
    }

    fn new_failed(protocol: NetlinkProtocolId) -> Self {
        Self::with_inner(protocol, Inner::Failed)
    }

    fn with_inner(protocol: NetlinkProtocolId, inner: Inner<S>) -> Self {
        Self {
            protocol,
            inner,
            last_seq: None,
            receive_size: DEFAULT_RECEIVE_SIZE,
            receive_buffer: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.inner, Inner::Failed)
    }

    pub fn protocol(&self) -> NetlinkProtocolId {
        self.protocol
    }

    /// Returns the sequence number of the last message handed to the kernel.
    pub fn last_seq(&self) -> Option<u32> {
        self.last_seq
    }

    /// Returns the largest datagram [`Self::receive_ack`] accepts.
    pub fn receive_size(&self) -> usize {
        self.receive_size
    }

    /// Sets the largest datagram [`Self::receive_ack`] accepts.
    pub fn set_receive_size(&mut self, size: usize) -> &mut Self {
        self.receive_size = size;
        self
    }

    /// Returns the size of the scratch buffer, which only ever grows.
    pub fn receive_buffer_capacity(&self) -> usize {
        self.receive_buffer.len()
    }

    /// Releases the descriptor. The socket is failed afterwards.
    pub fn close(&mut self) {
        if let Inner::Active(raw) = core::mem::replace(&mut self.inner, Inner::Failed) {
            drop(raw);
            debug!("netlink socket for {} closed", ProtocolDisplay(self.protocol));
        }
    }

    /// Returns the port ID the socket is bound to.
    ///
    /// The kernel assigns one if the socket was bound to port zero.
    pub fn local_port(&self) -> Result<PortNum> {
        let local_addr = self.inner.active()?.local_addr()?;
        Ok(local_addr.port())
    }

    /// Sends `msg` to `dst` in one datagram.
    ///
    /// A short write is reported as `EMSGSIZE`. Nothing is retried.
    pub fn send(&mut self, msg: &NlBuffer<'_>, dst: &NetlinkSocketAddr) -> Result<()> {
        let raw = self.inner.active()?;

        self.last_seq = Some(msg.header().seq);
        if log_enabled!(log::Level::Trace) {
            for segment in msg.segments() {
                trace!("netlink send to port {}: {:?}", dst.port(), segment);
            }
        }

        let sent_len = raw.send_to(msg.as_bytes(), dst).inspect_err(|err| {
            error!("failed to send a netlink message: {}", err);
        })?;
        if sent_len != msg.len() {
            error!(
                "netlink message truncated: {} of {} bytes sent",
                sent_len,
                msg.len()
            );
            return_errno_with_message!(Errno::EMSGSIZE, "truncated message");
        }

        Ok(())
    }

    /// Sends `msg` to the kernel.
    pub fn send_to_kernel(&mut self, msg: &NlBuffer<'_>) -> Result<()> {
        self.send(msg, &NetlinkSocketAddr::kernel())
    }

    /// Receives one datagram of at most `max_size` bytes.
    ///
    /// The returned buffer borrows the scratch buffer, so it must be dropped
    /// before the next receive.
    pub fn receive(&mut self, max_size: usize) -> Result<NlBuffer<'_>> {
        self.receive_from(max_size).map(|(buffer, _)| buffer)
    }

    /// Receives one datagram of at most `max_size` bytes, along with the sender's address.
    pub fn receive_from(&mut self, max_size: usize) -> Result<(NlBuffer<'_>, NetlinkSocketAddr)> {
        let (len, src) = self.receive_into_buffer(max_size)?;

        let buffer = NlBuffer::new(&self.receive_buffer[..len]).inspect_err(|err| {
            warn!("malformed netlink datagram from port {}: {}", src.port(), err);
        })?;

        Ok((buffer, src))
    }

    /// Waits for an ACK of the request with sequence number `seq`.
    ///
    /// An `NLMSG_ERROR` segment with a zero status is an ACK. A non-zero status
    /// is returned as the error number the kernel reported. A segment that
    /// replies to another request is dropped and reported as `EBADMSG`,
    /// whatever its status.
    ///
    /// Datagrams larger than [`Self::receive_size`] fail with `EMSGSIZE`.
    pub fn receive_ack(&mut self, seq: u32) -> Result<()> {
        let segment = self.receive_types(&[CSegmentType::ERROR as u16], self.receive_size)?;
        let error_segment = ErrorSegment::read_from(&segment)?;

        let acked_seq = error_segment.request_header().seq;
        if acked_seq != seq {
            warn!(
                "dropping netlink ACK for seq {} while waiting for seq {}",
                acked_seq, seq
            );
            return_errno_with_message!(Errno::EBADMSG, "received ACK for a different message");
        }

        error_segment.to_result().inspect_err(|err| {
            warn!(
                "netlink request {} rejected with status {}: {}",
                seq,
                error_segment.status(),
                err
            );
        })
    }

    /// Sends `msg` to the kernel and waits for its ACK.
    ///
    /// The request should carry the `ACK` flag, or the kernel only replies on errors.
    pub fn request_ack(&mut self, msg: &Message) -> Result<()> {
        self.send_to_kernel(&msg.as_buffer())?;
        self.receive_ack(msg.seq())
    }

    /// Receives until a segment whose type is in `types` arrives.
    ///
    /// Within a datagram, the first matching segment is returned and the rest
    /// are dropped. Other segments are logged and skipped. Receive errors end
    /// the wait, so a receive timeout bounds it with `EAGAIN`.
    pub fn receive_types(&mut self, types: &[u16], max_size: usize) -> Result<Segment<'_>> {
        loop {
            let (len, src) = self.receive_into_buffer(max_size)?;

            let mut matched = None;
            let mut segments = Segments::new(&self.receive_buffer[..len]);
            while let Some((range, segment)) = segments.next_with_range() {
                trace!("netlink receive from port {}: {:?}", src.port(), segment);
                if types.contains(&segment.type_()) {
                    matched = Some(range);
                    break;
                }
                warn!(
                    "ignoring unexpected netlink segment from port {}: {}",
                    src.port(),
                    segment.header()
                );
            }

            if let Some(range) = matched {
                return Ok(parse_segment(&self.receive_buffer, range));
            }
        }
    }

    /// Receives one datagram into the scratch buffer.
    ///
    /// Returns the datagram length, which never exceeds `max_size`.
    fn receive_into_buffer(&mut self, max_size: usize) -> Result<(usize, NetlinkSocketAddr)> {
        let raw = self.inner.active()?;

        if max_size == 0 {
            return_errno_with_message!(Errno::EINVAL, "the receive size must be positive");
        }
        if self.receive_buffer.len() < max_size {
            self.receive_buffer.resize(max_size, 0);
        }

        let (len, src) = raw
            .recv_from(&mut self.receive_buffer[..max_size])
            .inspect_err(|err| {
                if err.error() != Errno::EAGAIN {
                    error!("failed to receive a netlink message: {}", err);
                }
            })?;

        if len == 0 {
            return_errno_with_message!(Errno::ENODATA, "received an empty netlink message");
        }
        if len > max_size {
            warn!(
                "netlink message truncated: {} bytes received with room for {}",
                len, max_size
            );
            return_errno_with_message!(Errno::EMSGSIZE, "the received message is truncated");
        }

        trace!("netlink receive from port {}: {} bytes", src.port(), len);

        Ok((len, src))
    }

    fn reserve_receive_buffer(&mut self, size: usize) {
        if self.receive_buffer.len() < size {
            self.receive_buffer.resize(size, 0);
        }
    }
}

impl<S: RawNetlinkSocket> Debug for NetlinkSocket<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NetlinkSocket")
            .field("protocol", &ProtocolDisplay(self.protocol))
            .field("is_failed", &self.is_failed())
            .field("last_seq", &self.last_seq)
            .field("receive_size", &self.receive_size)
            .field("receive_buffer_capacity", &self.receive_buffer.len())
            .finish()
    }
}

/// Re-reads a segment that an earlier scan found at `range`.
fn parse_segment(bytes: &[u8], range: Range<usize>) -> Segment<'_> {
    Segments::new(&bytes[range])
        .next()
        .unwrap_or_else(|| unreachable!("the range was produced by a successful scan"))
}

/// Prints standard protocols by name.
struct ProtocolDisplay(NetlinkProtocolId);

impl core::fmt::Display for ProtocolDisplay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match protocol_name(self.0) {
            Some(protocol) => write!(f, "NETLINK_{:?}", protocol),
            None => write!(f, "netlink protocol {}", self.0),
        }
    }
}

impl Debug for ProtocolDisplay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::addr::StandardNetlinkProtocol;

    #[test]
    fn protocol_display() {
        assert_eq!(
            ProtocolDisplay(StandardNetlinkProtocol::ROUTE.into()).to_string(),
            "NETLINK_ROUTE"
        );
        assert_eq!(ProtocolDisplay(30).to_string(), "netlink protocol 30");
    }
}
