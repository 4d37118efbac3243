// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

use getset::{CopyGetters, Setters};

use crate::{
    addr::{GroupIdSet, NetlinkProtocolId, PortNum, UNSPECIFIED_PORT},
    socket::DEFAULT_RECEIVE_SIZE,
};

/// How a [`NetlinkSocket`] is opened.
///
/// [`NetlinkSocket`]: crate::NetlinkSocket
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters, Setters)]
#[get_copy = "pub"]
#[set = "pub"]
pub struct NetlinkConfig {
    /// The netlink family, such as `NETLINK_ROUTE`
    protocol: NetlinkProtocolId,
    /// The local port ID, or zero to let the kernel pick one
    port: PortNum,
    /// The multicast groups to join at bind time
    groups: GroupIdSet,
    /// The bound on every blocking receive, if any
    recv_timeout: Option<Duration>,
    /// The size the scratch buffer is allocated with, and the largest ACK datagram accepted
    max_receive_size: usize,
}

impl NetlinkConfig {
    /// Creates a config with a kernel-assigned port, no groups and no receive timeout.
    pub fn new(protocol: NetlinkProtocolId) -> Self {
        Self {
            protocol,
            port: UNSPECIFIED_PORT,
            groups: GroupIdSet::new_empty(),
            recv_timeout: None,
            max_receive_size: DEFAULT_RECEIVE_SIZE,
        }
    }
}
