// SPDX-License-Identifier: MPL-2.0

use super::{AckFlags, CMsgSegHdr, CSegmentType, NLMSG_HDRLEN, Segment};
use crate::prelude::*;

/// `nlmsgerr` in Linux.
///
/// Reference: <https://elixir.bootlin.com/linux/v6.13/source/include/uapi/linux/netlink.h#L119>.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CErrorSegmentBody {
    /// Zero for an ACK, or a negated error number
    pub error: i32,
    /// The header of the request that caused this segment
    pub msg: CMsgSegHdr,
}

/// An `NLMSG_ERROR` segment, which is either an ACK or an error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSegment {
    header: CMsgSegHdr,
    body: CErrorSegmentBody,
}

impl ErrorSegment {
    /// Length of an error segment that does not echo the request payload.
    pub const CAPPED_LEN: usize = NLMSG_HDRLEN + size_of::<CErrorSegmentBody>();

    /// Creates the reply to a request.
    ///
    /// `error` is `None` for a successful ACK. The request payload is never echoed,
    /// so the reply is marked as capped.
    pub fn new_from_request(request_header: &CMsgSegHdr, error: Option<Error>) -> Self {
        let header = CMsgSegHdr {
            len: Self::CAPPED_LEN as u32,
            type_: CSegmentType::ERROR as u16,
            flags: AckFlags::CAPPED.bits(),
            seq: request_header.seq,
            pid: request_header.pid,
        };

        let error = match error {
            Some(error) => -(error.error() as i32),
            None => 0,
        };

        Self {
            header,
            body: CErrorSegmentBody {
                error,
                msg: *request_header,
            },
        }
    }

    /// Parses an error segment out of a received segment.
    pub fn read_from(segment: &Segment<'_>) -> Result<Self> {
        if segment.type_() != CSegmentType::ERROR as u16 {
            return_errno_with_message!(Errno::EINVAL, "the segment is not an error segment");
        }

        let Some(body) = segment.read_body::<CErrorSegmentBody>() else {
            return_errno_with_message!(Errno::EBADMSG, "the error segment is too short");
        };

        Ok(Self {
            header: *segment.header(),
            body,
        })
    }

    pub fn header(&self) -> &CMsgSegHdr {
        &self.header
    }

    /// Returns the header of the request this segment replies to.
    pub fn request_header(&self) -> &CMsgSegHdr {
        &self.body.msg
    }

    /// Returns the raw status: zero for an ACK, or a negated error number.
    pub fn status(&self) -> i32 {
        self.body.error
    }

    pub fn is_ack(&self) -> bool {
        self.body.error == 0
    }

    /// Converts the status into a `Result`.
    ///
    /// Status codes that are not known error numbers are reported as `EPROTO`.
    pub fn to_result(&self) -> Result<()> {
        if self.is_ack() {
            return Ok(());
        }

        match Errno::from_negated(self.body.error) {
            Some(errno) => Err(Error::new(errno)),
            None => {
                warn!("netlink error segment with unknown status {}", self.body.error);
                Err(Error::with_message(
                    Errno::EPROTO,
                    "the kernel reported an unknown error status",
                ))
            }
        }
    }

    /// Encodes the segment.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::CAPPED_LEN);
        bytes.extend_from_slice(self.header.as_bytes());
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}
