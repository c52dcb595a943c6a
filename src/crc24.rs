//! OpenPGP CRC-24 checksum
//!
//! Initial value `0xB704CE`, generator `0x1864CFB`, computed over the raw
//! body bytes before radix-64 encoding.

use std::hash::Hasher;

use base64::{Engine, engine::general_purpose::STANDARD};
use crc24::Crc24Hasher;

/// Register value before any byte has been consumed.
pub const CRC24_INIT: u32 = 0xB7_04CE;

const CRC24_MASK: u64 = 0xFF_FFFF;

/// Running checksum owned by a single encode or decode pass.
pub struct Crc24 {
    hasher: Crc24Hasher,
}

impl Crc24 {
    pub fn new() -> Self {
        Self {
            hasher: Crc24Hasher::new(),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.write(bytes);
    }

    /// The current 24-bit checksum.
    pub fn value(&self) -> u32 {
        (self.hasher.finish() & CRC24_MASK) as u32
    }

    /// Checksum line payload: the three big-endian checksum bytes in radix-64.
    pub fn encoded(&self) -> String {
        STANDARD.encode(to_be_bytes(self.value()))
    }
}

impl Default for Crc24 {
    fn default() -> Self {
        Self::new()
    }
}

fn to_be_bytes(crc: u32) -> [u8; 3] {
    let [_, hi, mid, lo] = crc.to_be_bytes();
    [hi, mid, lo]
}

/// Parses the four radix-64 characters of a checksum line (without the `=`).
///
/// Returns `None` if they do not decode to exactly three bytes.
pub fn parse_encoded(encoded: &[u8]) -> Option<u32> {
    if encoded.len() != 4 {
        return None;
    }
    let mut buf = [0u8; 3];
    match STANDARD.decode_slice(encoded, &mut buf) {
        Ok(3) => Some(u32::from_be_bytes([0, buf[0], buf[1], buf[2]])),
        _ => None,
    }
}
