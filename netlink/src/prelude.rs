// SPDX-License-Identifier: MPL-2.0

#![allow(unused)]

pub(crate) use core::fmt::Debug;

pub(crate) use bitflags::bitflags;
pub(crate) use int_to_c_enum::TryFromInt;
pub(crate) use log::{debug, error, info, log_enabled, trace, warn};
pub(crate) use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub(crate) use crate::error::{Errno, Error};
pub(crate) type Result<T> = core::result::Result<T, Error>;
pub(crate) use crate::{return_errno, return_errno_with_message};
