// SPDX-License-Identifier: MPL-2.0

use core::fmt;

use crate::prelude::*;

/// `nlmsghdr` in Linux.
///
/// Reference: <https://elixir.bootlin.com/linux/v6.13/source/include/uapi/linux/netlink.h#L52>.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CMsgSegHdr {
    /// Length of the segment, including the header
    pub len: u32,
    /// Type of segment content
    pub type_: u16,
    /// Additional flags
    pub flags: u16,
    /// Sequence number
    pub seq: u32,
    /// Sending process port ID
    pub pid: u32,
}

impl CMsgSegHdr {
    /// Creates a header for a segment that is about to be built.
    ///
    /// The length is fixed up once the segment is complete.
    pub const fn new(type_: u16, flags: u16, seq: u32) -> Self {
        Self {
            len: 0,
            type_,
            flags,
            seq,
            pid: 0,
        }
    }

    pub fn common_flags(&self) -> SegHdrCommonFlags {
        SegHdrCommonFlags::from_bits_truncate(self.flags)
    }

    pub fn segment_type(&self) -> Option<CSegmentType> {
        CSegmentType::try_from(self.type_).ok()
    }
}

impl fmt::Display for CMsgSegHdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segment_type() {
            Some(type_) => write!(f, "{{{:?}", type_)?,
            None => write!(f, "{{type={}", self.type_)?,
        }
        write!(
            f,
            ", len={}, flags={:#x}, seq={}, pid={}}}",
            self.len, self.flags, self.seq, self.pid
        )
    }
}

/// Standard segment types that carry no protocol-specific meaning.
///
/// Types below [`NLMSG_MIN_TYPE`] are reserved for control segments.
#[repr(u16)]
#[derive(Debug, Clone, Copy, TryFromInt, PartialEq, Eq, PartialOrd, Ord)]
#[expect(clippy::upper_case_acronyms)]
pub enum CSegmentType {
    NOOP = 1,
    ERROR = 2,
    DONE = 3,
    OVERRUN = 4,
}

/// The first segment type that is free for protocol use.
pub const NLMSG_MIN_TYPE: u16 = 0x10;

bitflags! {
    /// Common flags used in [`CMsgSegHdr`].
    ///
    /// Reference: <https://elixir.bootlin.com/linux/v6.13/source/include/uapi/linux/netlink.h#L62>.
    pub struct SegHdrCommonFlags: u16 {
        /// Indicates a request segment
        const REQUEST = 0x01;
        /// Multipart segment, terminated by `NLMSG_DONE`
        const MULTI = 0x02;
        /// Reply with an acknowledgment, with zero or an error code
        const ACK = 0x04;
        /// Echo this request
        const ECHO = 0x08;
        /// Dump was inconsistent due to sequence change
        const DUMP_INTR = 0x10;
        /// Dump was filtered as requested
        const DUMP_FILTERED = 0x20;
    }
}

bitflags! {
    /// Modifiers to GET requests.
    pub struct GetRequestFlags: u16 {
        /// Specify the tree root
        const ROOT = 0x100;
        /// Return all matching results
        const MATCH = 0x200;
        /// Atomic get
        const ATOMIC = 0x400;
        const DUMP = Self::ROOT.bits | Self::MATCH.bits;
    }
}

bitflags! {
    /// Modifiers to NEW requests.
    pub struct NewRequestFlags: u16 {
        /// Override the existing object
        const REPLACE = 0x100;
        /// Do not touch the object if it exists
        const EXCL = 0x200;
        /// Create if it does not exist
        const CREATE = 0x400;
        /// Add to the end of the list
        const APPEND = 0x800;
    }
}

bitflags! {
    /// Flags of `NLMSG_ERROR` segments.
    pub struct AckFlags: u16 {
        /// The request was capped
        const CAPPED = 0x100;
        /// Extended ACK TLVs were included
        const ACK_TLVS = 0x200;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_layout() {
        assert_eq!(size_of::<CMsgSegHdr>(), 16);

        let header = CMsgSegHdr {
            len: 16,
            type_: CSegmentType::DONE as u16,
            flags: (SegHdrCommonFlags::REQUEST | SegHdrCommonFlags::ACK).bits(),
            seq: 7,
            pid: 9,
        };
        let bytes = header.as_bytes();
        assert_eq!(&bytes[0..4], &16u32.to_ne_bytes());
        assert_eq!(&bytes[4..6], &3u16.to_ne_bytes());
        assert_eq!(&bytes[6..8], &5u16.to_ne_bytes());
        assert_eq!(&bytes[8..12], &7u32.to_ne_bytes());
        assert_eq!(&bytes[12..16], &9u32.to_ne_bytes());
    }

    #[test]
    fn segment_types() {
        let mut header = CMsgSegHdr::new(CSegmentType::ERROR as u16, 0, 1);
        assert_eq!(header.segment_type(), Some(CSegmentType::ERROR));

        header.type_ = NLMSG_MIN_TYPE;
        assert_eq!(header.segment_type(), None);
        assert_eq!(
            header.to_string(),
            "{type=16, len=0, flags=0x0, seq=1, pid=0}"
        );
    }

    #[test]
    fn dump_flags() {
        let flags = GetRequestFlags::from_bits_truncate(0x300 | 0x1);
        assert!(flags.contains(GetRequestFlags::DUMP));

        let header = CMsgSegHdr::new(NLMSG_MIN_TYPE, 0x305, 1);
        assert_eq!(
            header.common_flags(),
            SegHdrCommonFlags::REQUEST | SegHdrCommonFlags::ACK
        );
    }
}
