// SPDX-License-Identifier: MPL-2.0

//! Netlink attributes.
//!
//! Netlink attributes provide additional information for each segment.
//! Each netlink attribute consists of two components:
//! 1. Header: The attribute header is of type [`CAttrHeader`],
//!    which specifies the type and length of the attribute. The meaning of
//!    the type depends on the segment type, which this crate does not interpret.
//! 2. Payload: The attribute's payload, which can vary in type.
//!    The payload can also include one or multiple other attributes,
//!    known as nested attributes.
//!
//! Both the header and payload must be aligned to [`NLMSG_ALIGN`]:
//!
//! ┌────────┬─────────┬─────────┬─────────┐
//! │ Header │ Padding │ Payload │ Padding │
//! └────────┴─────────┴─────────┴─────────┘

use core::ffi::CStr;

use align_ext::AlignExt;

use super::NLMSG_ALIGN;
use crate::prelude::*;

/// Netlink attribute header.
///
/// Reference: <https://elixir.bootlin.com/linux/v6.13/source/include/uapi/linux/netlink.h#L229>.
//
// The layout of the `type_` field is structured as follows:
// ┌────────┬───────────────┬──────────┐
// │ Nested │ Net Byteorder │ Payload  │
// └────────┴───────────────┴──────────┘
//   bit 15      bit 14       bits 13-0
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct CAttrHeader {
    pub len: u16,
    pub type_: u16,
}

impl CAttrHeader {
    pub fn type_(&self) -> u16 {
        self.type_ & ATTRIBUTE_TYPE_MASK
    }

    pub fn is_nested(&self) -> bool {
        self.type_ & IS_NESTED_MASK != 0
    }

    pub fn is_net_byteorder(&self) -> bool {
        self.type_ & IS_NET_BYTEORDER_MASK != 0
    }
}

pub const IS_NESTED_MASK: u16 = 1u16 << 15;
pub const IS_NET_BYTEORDER_MASK: u16 = 1u16 << 14;
const ATTRIBUTE_TYPE_MASK: u16 = !(IS_NESTED_MASK | IS_NET_BYTEORDER_MASK);

/// Length of an attribute header.
pub const NLA_HDRLEN: usize = size_of::<CAttrHeader>();

/// A borrowed netlink attribute.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Attr<'a> {
    type_: u16,
    nested: bool,
    net_byteorder: bool,
    payload: &'a [u8],
}

impl<'a> Attr<'a> {
    /// Returns the type of the attribute, without the nested and byte-order bits.
    pub fn type_(&self) -> u16 {
        self.type_
    }

    pub fn is_nested(&self) -> bool {
        self.nested
    }

    pub fn is_net_byteorder(&self) -> bool {
        self.net_byteorder
    }

    /// Returns the payload (excluding padding).
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Interprets the payload as attributes.
    ///
    /// Some families don't set the nested bit, so this method does not check it.
    pub fn nested(&self) -> Attrs<'a> {
        Attrs::new(self.payload)
    }

    pub fn as_u8(&self) -> Option<u8> {
        self.read_value()
    }

    pub fn as_u16(&self) -> Option<u16> {
        self.read_value::<u16>().map(|value| {
            if self.net_byteorder {
                u16::from_be(value)
            } else {
                value
            }
        })
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.read_value::<u32>().map(|value| {
            if self.net_byteorder {
                u32::from_be(value)
            } else {
                value
            }
        })
    }

    /// Interprets the payload as a NUL-terminated string.
    pub fn as_str(&self) -> Option<&'a str> {
        CStr::from_bytes_until_nul(self.payload)
            .ok()?
            .to_str()
            .ok()
    }

    fn read_value<T: FromBytes>(&self) -> Option<T> {
        if self.payload.len() != size_of::<T>() {
            return None;
        }
        T::read_from_bytes(self.payload).ok()
    }
}

impl Debug for Attr<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Attr")
            .field("type_", &self.type_)
            .field("nested", &self.nested)
            .field("len", &self.payload.len())
            .finish()
    }
}

/// An iterator over a run of attributes.
///
/// The iteration stops at the first attribute whose declared length does not
/// fit the remaining bytes.
#[derive(Clone)]
pub struct Attrs<'a> {
    remaining: &'a [u8],
}

impl<'a> Attrs<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    /// Finds the first attribute of the given type.
    pub fn find_type(mut self, type_: u16) -> Option<Attr<'a>> {
        self.find(|attr| attr.type_() == type_)
    }
}

impl<'a> Iterator for Attrs<'a> {
    type Item = Attr<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let Ok((header, _)) = CAttrHeader::read_from_prefix(self.remaining) else {
            debug!("ignoring {} trailing attribute bytes", self.remaining.len());
            self.remaining = &[];
            return None;
        };

        let attr_len = header.len as usize;
        if attr_len < NLA_HDRLEN || attr_len > self.remaining.len() {
            warn!(
                "malformed netlink attribute (type {}, len {}): {} bytes remain",
                header.type_(),
                attr_len,
                self.remaining.len()
            );
            self.remaining = &[];
            return None;
        }

        let attr = Attr {
            type_: header.type_(),
            nested: header.is_nested(),
            net_byteorder: header.is_net_byteorder(),
            payload: &self.remaining[NLA_HDRLEN..attr_len],
        };

        let advance = attr_len.align_up(NLMSG_ALIGN).min(self.remaining.len());
        self.remaining = &self.remaining[advance..];

        Some(attr)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn push_attr(bytes: &mut Vec<u8>, type_: u16, payload: &[u8]) {
        let header = CAttrHeader {
            len: (NLA_HDRLEN + payload.len()) as u16,
            type_,
        };
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(payload);
        bytes.resize(bytes.len().align_up(NLMSG_ALIGN), 0);
    }

    #[test]
    fn iterates_attrs() {
        let mut bytes = Vec::new();
        push_attr(&mut bytes, 3, b"can0\0");
        push_attr(&mut bytes, 4, &1500u32.to_ne_bytes());
        push_attr(&mut bytes, 5 | IS_NET_BYTEORDER_MASK, &80u16.to_be_bytes());

        let attrs: Vec<_> = Attrs::new(&bytes).collect();
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].as_str(), Some("can0"));
        assert_eq!(attrs[1].as_u32(), Some(1500));
        assert_eq!(attrs[1].as_u16(), None);
        assert_eq!(attrs[2].type_(), 5);
        assert!(attrs[2].is_net_byteorder());
        assert_eq!(attrs[2].as_u16(), Some(80));
    }

    #[test]
    fn nested_attrs() {
        let mut inner = Vec::new();
        push_attr(&mut inner, 1, b"can\0");
        let mut outer = Vec::new();
        push_attr(&mut outer, 18 | IS_NESTED_MASK, &inner);

        let link_info = Attrs::new(&outer).find_type(18).unwrap();
        assert!(link_info.is_nested());
        let kind = link_info.nested().find_type(1).unwrap();
        assert_eq!(kind.as_str(), Some("can"));
    }

    #[test]
    fn stops_at_malformed_attr() {
        let mut bytes = Vec::new();
        push_attr(&mut bytes, 1, &[0; 4]);
        // An attribute that claims more bytes than are present.
        bytes.extend_from_slice(&64u16.to_ne_bytes());
        bytes.extend_from_slice(&2u16.to_ne_bytes());

        let types: Vec<_> = Attrs::new(&bytes).map(|attr| attr.type_()).collect();
        assert_eq!(types, vec![1]);
    }
}
