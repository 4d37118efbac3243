// SPDX-License-Identifier: MPL-2.0

//! Building outbound netlink requests.
//!
//! The builder writes a single segment: the header, an optional fixed-size
//! body and a sequence of attributes, each padded to [`NLMSG_ALIGN`].
//! It knows nothing about the meaning of types or attributes, which stays
//! with the protocol-specific encoders.

use align_ext::AlignExt;

use super::{
    CMsgSegHdr, NLMSG_ALIGN, NLMSG_HDRLEN, NlBuffer,
    attr::{CAttrHeader, NLA_HDRLEN},
};
use crate::prelude::*;

/// Builder of a single-segment netlink request.
#[derive(Debug)]
pub struct MessageBuilder {
    bytes: Vec<u8>,
    has_attrs: bool,
    error: Option<Error>,
}

/// Marks the start of a nested attribute, see [`MessageBuilder::begin_nest`].
#[must_use]
#[derive(Debug)]
pub struct NestToken {
    offset: usize,
}

impl MessageBuilder {
    /// Starts a new segment of the given type.
    ///
    /// The sequence number and port ID are zero until set.
    pub fn new(type_: u16, flags: u16) -> Self {
        let header = CMsgSegHdr::new(type_, flags, 0);
        Self {
            bytes: header.as_bytes().to_vec(),
            has_attrs: false,
            error: None,
        }
    }

    pub fn seq(&mut self, seq: u32) -> &mut Self {
        self.bytes[8..12].copy_from_slice(&seq.to_ne_bytes());
        self
    }

    pub fn pid(&mut self, pid: u32) -> &mut Self {
        self.bytes[12..16].copy_from_slice(&pid.to_ne_bytes());
        self
    }

    /// Appends the fixed-size family header, such as `ifinfomsg`.
    ///
    /// The body must precede all attributes.
    pub fn body<T: IntoBytes + Immutable + ?Sized>(&mut self, body: &T) -> &mut Self {
        if self.has_attrs {
            self.fail(Error::with_message(
                Errno::EINVAL,
                "the body must precede the attributes",
            ));
            return self;
        }

        self.bytes.extend_from_slice(body.as_bytes());
        self.pad();
        self
    }

    /// Appends an attribute with a raw payload.
    pub fn attr(&mut self, type_: u16, payload: &[u8]) -> &mut Self {
        let Some(len) = attr_len(NLA_HDRLEN + payload.len()) else {
            self.fail(Error::with_message(Errno::EMSGSIZE, "the attribute is too long"));
            return self;
        };

        self.has_attrs = true;
        let header = CAttrHeader { len, type_ };
        self.bytes.extend_from_slice(header.as_bytes());
        self.bytes.extend_from_slice(payload);
        self.pad();
        self
    }

    pub fn attr_u8(&mut self, type_: u16, value: u8) -> &mut Self {
        self.attr(type_, &[value])
    }

    pub fn attr_u16(&mut self, type_: u16, value: u16) -> &mut Self {
        self.attr(type_, &value.to_ne_bytes())
    }

    pub fn attr_u32(&mut self, type_: u16, value: u32) -> &mut Self {
        self.attr(type_, &value.to_ne_bytes())
    }

    /// Appends a NUL-terminated string attribute.
    pub fn attr_str(&mut self, type_: u16, value: &str) -> &mut Self {
        let mut payload = Vec::with_capacity(value.len() + 1);
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
        self.attr(type_, &payload)
    }

    /// Opens a nested attribute.
    ///
    /// Every attribute added before the matching [`Self::end_nest`] becomes a
    /// child of this attribute.
    pub fn begin_nest(&mut self, type_: u16) -> NestToken {
        self.has_attrs = true;
        let offset = self.bytes.len();
        let header = CAttrHeader { len: 0, type_ };
        self.bytes.extend_from_slice(header.as_bytes());
        NestToken { offset }
    }

    /// Closes a nested attribute opened by [`Self::begin_nest`].
    pub fn end_nest(&mut self, token: NestToken) -> &mut Self {
        let Some(len) = attr_len(self.bytes.len() - token.offset) else {
            self.fail(Error::with_message(
                Errno::EMSGSIZE,
                "the nested attribute is too long",
            ));
            return self;
        };

        self.bytes[token.offset..token.offset + 2].copy_from_slice(&len.to_ne_bytes());
        self
    }

    /// Finishes the segment.
    ///
    /// Fails with the first error met while building. The builder is left
    /// untouched, so it can be adjusted and finished again.
    pub fn finish(&mut self) -> Result<Message> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut bytes = self.bytes.clone();
        let Ok(len) = u32::try_from(bytes.len()) else {
            return_errno_with_message!(Errno::EMSGSIZE, "the message is too long");
        };
        bytes[0..4].copy_from_slice(&len.to_ne_bytes());

        Ok(Message { bytes })
    }

    fn pad(&mut self) {
        let aligned_len = self.bytes.len().align_up(NLMSG_ALIGN);
        self.bytes.resize(aligned_len, 0);
    }

    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

fn attr_len(len: usize) -> Option<u16> {
    u16::try_from(len).ok()
}

/// An encoded netlink request.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Vec<u8>,
}

impl Message {
    /// Returns the message as a buffer that can be sent.
    pub fn as_buffer(&self) -> NlBuffer<'_> {
        NlBuffer::new(&self.bytes)
            .unwrap_or_else(|_| unreachable!("the builder always writes a valid header"))
    }

    pub fn header(&self) -> CMsgSegHdr {
        *self.as_buffer().header()
    }

    pub fn seq(&self) -> u32 {
        self.header().seq
    }

    /// Replaces the sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        self.bytes[8..12].copy_from_slice(&seq.to_ne_bytes());
    }

    /// Returns the payload, which is everything after the header.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[NLMSG_HDRLEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.as_buffer().fmt(f)
    }
}
