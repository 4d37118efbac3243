// SPDX-License-Identifier: MPL-2.0

//! Netlink message envelope.
//!
//! A netlink datagram carries one or more segments (`nlmsghdr` records).
//! Each segment consists of two components:
//! 1. Header: a [`CMsgSegHdr`] that declares the total segment length, type,
//!    flags, sequence number and the sender's port ID.
//! 2. Payload: the family-specific body, usually followed by attributes.
//!
//! Segments are aligned to [`NLMSG_ALIGN`] inside a datagram:
//!
//! ┌────────┬─────────┬─────────┬────────┬─────────┬─────────┐
//! │ Header │ Payload │ Padding │ Header │ Payload │ Padding │ ...
//! └────────┴─────────┴─────────┴────────┴─────────┴─────────┘
//!
//! This module only interprets the envelope. Payloads are handed out as
//! byte slices; [`Segment::read_body`] and [`attr`] help callers that want
//! to decode them.

use align_ext::AlignExt;

use crate::prelude::*;

mod ack;
pub mod attr;
mod builder;
mod header;

pub use ack::{CErrorSegmentBody, ErrorSegment};
pub use builder::{Message, MessageBuilder, NestToken};
pub use header::{
    AckFlags, CMsgSegHdr, CSegmentType, GetRequestFlags, NLMSG_MIN_TYPE, NewRequestFlags,
    SegHdrCommonFlags,
};

/// Alignment of segments and attributes.
pub const NLMSG_ALIGN: usize = 4;

/// Length of a segment header.
pub const NLMSG_HDRLEN: usize = size_of::<CMsgSegHdr>();

/// A view over the bytes of a netlink datagram.
///
/// The view is either the caller's encoded request or a received datagram
/// that borrows the receive buffer of a [`NetlinkSocket`]. In the latter case,
/// the socket cannot receive again until the view is dropped.
///
/// [`NetlinkSocket`]: crate::NetlinkSocket
#[derive(Clone, Copy)]
pub struct NlBuffer<'a> {
    header: CMsgSegHdr,
    bytes: &'a [u8],
}

impl<'a> NlBuffer<'a> {
    /// Creates a view over `bytes`.
    ///
    /// The first header must be complete, and the length it declares must
    /// lie between the header length and the length of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let Ok((header, _)) = CMsgSegHdr::read_from_prefix(bytes) else {
            return_errno_with_message!(Errno::EBADMSG, "the buffer is smaller than a header");
        };

        let declared_len = header.len as usize;
        if declared_len < NLMSG_HDRLEN {
            return_errno_with_message!(Errno::EBADMSG, "the declared length is too small");
        }
        if declared_len > bytes.len() {
            return_errno_with_message!(Errno::EBADMSG, "the declared length exceeds the buffer");
        }

        Ok(Self { header, bytes })
    }

    /// Returns the header of the first segment.
    pub fn header(&self) -> &CMsgSegHdr {
        &self.header
    }

    /// Returns the first segment.
    pub fn first(&self) -> Option<Segment<'a>> {
        self.segments().next()
    }

    /// Returns an iterator over all segments in the buffer.
    pub fn segments(&self) -> Segments<'a> {
        Segments::new(self.bytes)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Debug for NlBuffer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.segments()).finish()
    }
}

/// A single segment of a datagram.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    header: CMsgSegHdr,
    payload: &'a [u8],
}

impl<'a> Segment<'a> {
    pub fn header(&self) -> &CMsgSegHdr {
        &self.header
    }

    pub fn type_(&self) -> u16 {
        self.header.type_
    }

    pub fn seq(&self) -> u32 {
        self.header.seq
    }

    /// Returns the payload, excluding the header and the trailing padding.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Reads a fixed-size body from the start of the payload.
    ///
    /// The body is copied, so the payload needs no particular alignment.
    /// Returns `None` if the payload is too short.
    pub fn read_body<T: FromBytes>(&self) -> Option<T> {
        T::read_from_prefix(self.payload)
            .ok()
            .map(|(body, _)| body)
    }

    /// Returns the attributes that follow a fixed-size body of type `T`.
    pub fn attrs_after<T>(&self) -> attr::Attrs<'a> {
        let body_len = size_of::<T>().align_up(NLMSG_ALIGN);
        attr::Attrs::new(self.payload.get(body_len..).unwrap_or_default())
    }
}

impl Debug for Segment<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({} payload bytes)", self.header, self.payload.len())
    }
}

/// An iterator over the segments of a datagram.
///
/// The iteration stops at the first segment whose declared length does not
/// fit the remaining bytes.
#[derive(Clone)]
pub struct Segments<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Segments<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Returns the next segment along with its byte range in the datagram.
    pub(crate) fn next_with_range(&mut self) -> Option<(core::ops::Range<usize>, Segment<'a>)> {
        let remaining = self.bytes.get(self.offset..)?;
        if remaining.is_empty() {
            return None;
        }

        let Ok((header, _)) = CMsgSegHdr::read_from_prefix(remaining) else {
            warn!(
                "ignoring {} trailing bytes that cannot hold a netlink header",
                remaining.len()
            );
            self.offset = self.bytes.len();
            return None;
        };

        let segment_len = header.len as usize;
        if segment_len < NLMSG_HDRLEN || segment_len > remaining.len() {
            warn!(
                "malformed netlink segment {}: {} bytes remain in the datagram",
                header,
                remaining.len()
            );
            self.offset = self.bytes.len();
            return None;
        }

        let start = self.offset;
        let segment = Segment {
            header,
            payload: &remaining[NLMSG_HDRLEN..segment_len],
        };
        self.offset = (start + segment_len.align_up(NLMSG_ALIGN)).min(self.bytes.len());

        Some((start..start + segment_len, segment))
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_with_range().map(|(_, segment)| segment)
    }
}
