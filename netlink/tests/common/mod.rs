// SPDX-License-Identifier: MPL-2.0

//! A scripted netlink socket for tests.
//!
//! The fake replays queued datagrams and errors, and records every call so
//! that tests can check how many system calls the transport made.

#![allow(dead_code)]

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use nl_transport::{
    CMsgSegHdr, Errno, Error, ErrorSegment, NLMSG_ALIGN, NLMSG_HDRLEN, NetlinkSocketAddr,
    RawNetlinkSocket, Result,
};

pub const KERNEL_PORT: u32 = 0;
pub const LOCAL_PORT: u32 = 4321;

pub enum Incoming {
    Datagram(Vec<u8>, NetlinkSocketAddr),
    Error(Errno),
}

#[derive(Default)]
pub struct Script {
    pub incoming: VecDeque<Incoming>,
    pub sent: Vec<(Vec<u8>, NetlinkSocketAddr)>,
    pub bound: Option<NetlinkSocketAddr>,
    pub syscalls: usize,
    pub short_write: Option<usize>,
    pub fail_bind: bool,
    pub closed: bool,
}

/// A handle to the state shared with a [`ScriptedSocket`].
#[derive(Clone, Default)]
pub struct ScriptHandle(Rc<RefCell<Script>>);

impl ScriptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn socket(&self) -> ScriptedSocket {
        ScriptedSocket(self.0.clone())
    }

    pub fn push_datagram(&self, datagram: Vec<u8>) {
        self.push_datagram_from(datagram, NetlinkSocketAddr::kernel());
    }

    pub fn push_datagram_from(&self, datagram: Vec<u8>, src: NetlinkSocketAddr) {
        self.0
            .borrow_mut()
            .incoming
            .push_back(Incoming::Datagram(datagram, src));
    }

    pub fn push_error(&self, errno: Errno) {
        self.0.borrow_mut().incoming.push_back(Incoming::Error(errno));
    }

    pub fn set_short_write(&self, len: usize) {
        self.0.borrow_mut().short_write = Some(len);
    }

    pub fn set_fail_bind(&self) {
        self.0.borrow_mut().fail_bind = true;
    }

    pub fn syscalls(&self) -> usize {
        self.0.borrow().syscalls
    }

    pub fn sent(&self) -> Vec<(Vec<u8>, NetlinkSocketAddr)> {
        self.0.borrow().sent.clone()
    }

    pub fn bound(&self) -> Option<NetlinkSocketAddr> {
        self.0.borrow().bound
    }

    pub fn is_closed(&self) -> bool {
        self.0.borrow().closed
    }

    pub fn pending(&self) -> usize {
        self.0.borrow().incoming.len()
    }
}

pub struct ScriptedSocket(Rc<RefCell<Script>>);

impl RawNetlinkSocket for ScriptedSocket {
    fn bind(&self, addr: &NetlinkSocketAddr) -> Result<()> {
        let mut script = self.0.borrow_mut();
        script.syscalls += 1;
        if script.fail_bind {
            return Err(Error::new(Errno::EADDRINUSE));
        }
        script.bound = Some(*addr);
        Ok(())
    }

    fn send_to(&self, buf: &[u8], dst: &NetlinkSocketAddr) -> Result<usize> {
        let mut script = self.0.borrow_mut();
        script.syscalls += 1;
        let sent_len = script.short_write.unwrap_or(buf.len()).min(buf.len());
        script.sent.push((buf[..sent_len].to_vec(), *dst));
        Ok(sent_len)
    }

    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, NetlinkSocketAddr)> {
        let mut script = self.0.borrow_mut();
        script.syscalls += 1;
        match script.incoming.pop_front() {
            Some(Incoming::Datagram(datagram, src)) => {
                let copy_len = datagram.len().min(buf.len());
                buf[..copy_len].copy_from_slice(&datagram[..copy_len]);
                Ok((datagram.len(), src))
            }
            Some(Incoming::Error(errno)) => Err(Error::new(errno)),
            // A blocking socket with a receive timeout.
            None => Err(Error::new(Errno::EAGAIN)),
        }
    }

    fn local_addr(&self) -> Result<NetlinkSocketAddr> {
        let mut script = self.0.borrow_mut();
        script.syscalls += 1;
        script
            .bound
            .map(|addr| {
                if addr.port() == 0 {
                    NetlinkSocketAddr::new(LOCAL_PORT, addr.groups())
                } else {
                    addr
                }
            })
            .ok_or(Error::new(Errno::EINVAL))
    }
}

impl Drop for ScriptedSocket {
    fn drop(&mut self) {
        self.0.borrow_mut().closed = true;
    }
}

/// Appends one segment to `datagram`, padded to the segment alignment.
pub fn push_segment(datagram: &mut Vec<u8>, type_: u16, seq: u32, payload: &[u8]) {
    let header = CMsgSegHdr {
        len: (NLMSG_HDRLEN + payload.len()) as u32,
        type_,
        flags: 0,
        seq,
        pid: KERNEL_PORT,
    };
    datagram.extend_from_slice(zerocopy::IntoBytes::as_bytes(&header));
    datagram.extend_from_slice(payload);
    let padded_len = datagram.len().div_ceil(NLMSG_ALIGN) * NLMSG_ALIGN;
    datagram.resize(padded_len, 0);
}

/// Encodes the kernel's reply to a request with sequence number `seq`.
pub fn ack_datagram(seq: u32, status: i32) -> Vec<u8> {
    let request = CMsgSegHdr {
        len: NLMSG_HDRLEN as u32,
        type_: 16,
        flags: 0x5,
        seq,
        pid: LOCAL_PORT,
    };
    let mut datagram = ErrorSegment::new_from_request(&request, None).to_bytes();
    // The status sits right after the reply header.
    datagram[NLMSG_HDRLEN..NLMSG_HDRLEN + 4].copy_from_slice(&status.to_ne_bytes());
    datagram
}
