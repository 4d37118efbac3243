// SPDX-License-Identifier: MPL-2.0

//! A blocking netlink transport.
//!
//! This crate moves framed netlink messages between user space and the
//! kernel over an `AF_NETLINK` raw socket. It interprets the generic
//! envelope only: segment headers, `NLMSG_ERROR` ACKs and attribute TLVs.
//! Family-specific payloads are left to the caller.
//!
//! ```no_run
//! use nl_transport::{
//!     MessageBuilder, NetlinkConfig, NetlinkSocket, SegHdrCommonFlags, StandardNetlinkProtocol,
//! };
//!
//! # fn main() -> nl_transport::Result<()> {
//! let config = NetlinkConfig::new(StandardNetlinkProtocol::ROUTE.into());
//! let mut socket = NetlinkSocket::open(&config);
//!
//! let flags = SegHdrCommonFlags::REQUEST | SegHdrCommonFlags::ACK;
//! let request = MessageBuilder::new(16, flags.bits()).seq(1).finish()?;
//! socket.request_ack(&request)?;
//! # Ok(())
//! # }
//! ```

pub mod error;

mod addr;
mod config;
mod message;
mod prelude;
mod socket;

pub use addr::{
    GroupIdSet, MAX_GROUPS, NetlinkProtocolId, NetlinkSocketAddr, PortNum,
    StandardNetlinkProtocol, UNSPECIFIED_PORT,
};
pub use config::NetlinkConfig;
pub use error::{Errno, Error};
pub use message::{
    AckFlags, CErrorSegmentBody, CMsgSegHdr, CSegmentType, ErrorSegment, GetRequestFlags,
    Message, MessageBuilder, NLMSG_ALIGN, NLMSG_HDRLEN, NLMSG_MIN_TYPE, NestToken,
    NewRequestFlags, NlBuffer, SegHdrCommonFlags, Segment, Segments, attr,
};
pub use socket::{DEFAULT_RECEIVE_SIZE, NetlinkFd, NetlinkSocket, RawNetlinkSocket};

pub type Result<T> = core::result::Result<T, Error>;
