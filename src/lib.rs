//! pgparmor - OpenPGP ASCII armor encoding and decoding
//!
//! The [`codec`] module holds the streaming `encode`/`decode` operations;
//! [`armor`] has the framing and the in-memory [`armor::ArmorBlock`].

#![forbid(unsafe_code)]

pub mod armor;
pub mod codec;
pub mod crc24;
pub mod error;
pub mod file_ops;
pub mod radix64;
mod staging;

pub use crate::armor::{ArmorBlock, ArmorInfo, Headers};
pub use crate::codec::{DecodeOptions, EncodeOptions, decode, decode_with, encode, encode_with};
pub use crate::error::{ArmorError, ErrorCategory, ErrorKind, Result};
