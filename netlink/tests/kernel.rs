// SPDX-License-Identifier: MPL-2.0

//! Tests against real netlink sockets. None of them needs privileges.

use std::time::{Duration, Instant};

use nl_transport::{
    Errno, GroupIdSet, NetlinkConfig, NetlinkSocket, StandardNetlinkProtocol, UNSPECIFIED_PORT,
};

const UNSUPPORTED_PROTOCOL: u32 = 999;

#[test]
fn open_with_unsupported_protocol_fails() {
    let mut socket = NetlinkSocket::new(UNSUPPORTED_PROTOCOL, 0, GroupIdSet::new_empty());
    assert!(socket.is_failed());
    assert_eq!(socket.protocol(), UNSUPPORTED_PROTOCOL);
    assert_eq!(socket.receive(10).unwrap_err().error(), Errno::EBADF);
    assert_eq!(socket.receive_ack(1).unwrap_err().error(), Errno::EBADF);
}

#[test]
fn open_with_out_of_range_protocol_fails() {
    let mut socket = NetlinkSocket::new(u32::MAX, 0, GroupIdSet::new_empty());
    assert!(socket.is_failed());
    assert_eq!(socket.receive(10).unwrap_err().error(), Errno::EBADF);
}

#[test]
fn receive_timeout_bounds_the_wait() {
    let mut config = NetlinkConfig::new(StandardNetlinkProtocol::ROUTE.into());
    config.set_recv_timeout(Some(Duration::from_millis(50)));
    let mut socket = NetlinkSocket::open(&config);
    assert!(!socket.is_failed());
    assert_ne!(socket.local_port().unwrap(), UNSPECIFIED_PORT);

    let start = Instant::now();
    assert_eq!(socket.receive(100).unwrap_err().error(), Errno::EAGAIN);
    assert!(start.elapsed() >= Duration::from_millis(40));
    // A timeout does not fail the socket.
    assert!(!socket.is_failed());
    assert_eq!(socket.receive_size(), config.max_receive_size());
}
