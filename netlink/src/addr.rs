// SPDX-License-Identifier: MPL-2.0

//! Netlink socket addresses and protocol identifiers.

use nix::sys::socket::NetlinkAddr;

use crate::prelude::*;

pub type NetlinkProtocolId = u32;
pub type PortNum = u32;

/// The port number that lets the kernel pick one, and that identifies the kernel as a peer.
pub const UNSPECIFIED_PORT: PortNum = 0;

/// The maximum number of multicast groups a bind-time group mask can address.
pub const MAX_GROUPS: u32 = 32;

/// The socket address of a netlink socket.
///
/// The address contains the port number for unicast
/// and the group IDs for multicast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetlinkSocketAddr {
    port: PortNum,
    groups: GroupIdSet,
}

impl NetlinkSocketAddr {
    /// Creates a new netlink address.
    pub const fn new(port: PortNum, groups: GroupIdSet) -> Self {
        Self { port, groups }
    }

    /// Creates the address of the kernel.
    ///
    /// Both the port ID and group numbers are left unspecified.
    pub const fn kernel() -> Self {
        Self {
            port: UNSPECIFIED_PORT,
            groups: GroupIdSet::new_empty(),
        }
    }

    /// Returns the port number.
    pub const fn port(&self) -> PortNum {
        self.port
    }

    /// Returns the group ID set.
    pub const fn groups(&self) -> GroupIdSet {
        self.groups
    }

    /// Returns whether the address identifies the kernel.
    pub const fn is_kernel(&self) -> bool {
        self.port == UNSPECIFIED_PORT
    }
}

impl From<NetlinkSocketAddr> for NetlinkAddr {
    fn from(value: NetlinkSocketAddr) -> Self {
        NetlinkAddr::new(value.port(), value.groups().as_u32())
    }
}

impl From<NetlinkAddr> for NetlinkSocketAddr {
    fn from(value: NetlinkAddr) -> Self {
        NetlinkSocketAddr::new(value.pid(), GroupIdSet::new(value.groups()))
    }
}

/// A set of group IDs.
///
/// Each 1 bit in the inner mask represents one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupIdSet(u32);

impl GroupIdSet {
    /// Creates a new empty `GroupIdSet`.
    pub const fn new_empty() -> Self {
        Self(0)
    }

    /// Creates a new `GroupIdSet` with multiple groups.
    pub const fn new(groups: u32) -> Self {
        Self(groups)
    }

    /// Creates a set that contains one group.
    ///
    /// Group IDs start from 1, matching the `RTNLGRP_*` style constants.
    pub fn with_group(group_id: u32) -> Result<Self> {
        if group_id == 0 || group_id > MAX_GROUPS {
            return_errno_with_message!(Errno::EINVAL, "the group ID is out of range");
        }
        Ok(Self(1 << (group_id - 1)))
    }

    /// Adds some new groups.
    pub fn add_groups(&mut self, groups: GroupIdSet) {
        self.0 |= groups.0;
    }

    /// Drops some groups.
    pub fn drop_groups(&mut self, groups: GroupIdSet) {
        self.0 &= !groups.0;
    }

    /// Returns whether the set contains the group.
    pub fn contains(&self, group_id: u32) -> bool {
        group_id != 0 && group_id <= MAX_GROUPS && self.0 & (1 << (group_id - 1)) != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Netlink protocols that are assigned for specific usage.
///
/// Reference: <https://elixir.bootlin.com/linux/v6.0.9/source/include/uapi/linux/netlink.h#L9>.
#[expect(non_camel_case_types)]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromInt)]
pub enum StandardNetlinkProtocol {
    /// Routing/device hook, which also carries the CAN link configuration
    ROUTE = 0,
    USERSOCK = 2,
    SOCK_DIAG = 4,
    XFRM = 6,
    AUDIT = 9,
    CONNECTOR = 11,
    NETFILTER = 12,
    /// Kernel messages to userspace
    KOBJECT_UEVENT = 15,
    GENERIC = 16,
    RDMA = 20,
    CRYPTO = 21,
}

impl From<StandardNetlinkProtocol> for NetlinkProtocolId {
    fn from(value: StandardNetlinkProtocol) -> Self {
        value as NetlinkProtocolId
    }
}

/// Returns a printable name of the protocol, if the protocol is a standard one.
pub(crate) fn protocol_name(protocol: NetlinkProtocolId) -> Option<StandardNetlinkProtocol> {
    StandardNetlinkProtocol::try_from(protocol).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn group_set() {
        let mut groups = GroupIdSet::new_empty();
        assert!(groups.is_empty());

        groups.add_groups(GroupIdSet::with_group(1).unwrap());
        groups.add_groups(GroupIdSet::with_group(32).unwrap());
        assert_eq!(groups.as_u32(), 0x8000_0001);
        assert!(groups.contains(1));
        assert!(groups.contains(32));
        assert!(!groups.contains(2));
        assert!(!groups.contains(0));

        groups.drop_groups(GroupIdSet::new(0x1));
        assert_eq!(groups.as_u32(), 0x8000_0000);

        assert!(GroupIdSet::with_group(0).is_err());
        assert!(GroupIdSet::with_group(33).is_err());
    }

    #[test]
    fn nix_address_conversion() {
        let addr = NetlinkSocketAddr::new(1234, GroupIdSet::new(0b101));
        let nix_addr = NetlinkAddr::from(addr);
        assert_eq!(nix_addr.pid(), 1234);
        assert_eq!(nix_addr.groups(), 0b101);
        assert_eq!(NetlinkSocketAddr::from(nix_addr), addr);
    }

    #[test]
    fn kernel_address() {
        let kernel = NetlinkSocketAddr::kernel();
        assert!(kernel.is_kernel());
        assert!(kernel.groups().is_empty());
        assert_eq!(
            protocol_name(StandardNetlinkProtocol::GENERIC.into()),
            Some(StandardNetlinkProtocol::GENERIC)
        );
        assert_eq!(protocol_name(31), None);
    }
}
