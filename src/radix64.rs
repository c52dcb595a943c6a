//! Radix-64 (base64) transcoding for armor bodies
//!
//! The encoder keeps a carry window of up to two bytes between writes so that
//! input can arrive in chunks of any size, and wraps its output into CRLF
//! terminated lines of [`LINE_WIDTH`] characters. The decoder is fed one body
//! line at a time, ignores whitespace, and only accepts padding in the final
//! quantum.

use std::io::{self, Write};

use base64::engine::{GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD};
use base64::{Engine, alphabet};

use crate::error::{ArmorError, ErrorCategory, ErrorKind, Result};

/// Number of radix-64 characters per body line.
pub const LINE_WIDTH: usize = 64;

pub(crate) const CRLF: &[u8] = b"\r\n";

const PAD: u8 = b'=';

/// Decoding engine for body quanta; the unused bits of a padded final quantum
/// may be non-zero.
const BODY_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

fn is_alphabet(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'+' || c == b'/'
}

/// A writer that splits text into CRLF terminated lines of [`LINE_WIDTH`] bytes.
pub struct LineWrapper<W: Write> {
    inner: W,
    column: usize,
}

impl<W: Write> LineWrapper<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, column: 0 }
    }

    fn write_text(&mut self, mut text: &[u8]) -> io::Result<()> {
        while !text.is_empty() {
            let take = (LINE_WIDTH - self.column).min(text.len());
            self.inner.write_all(&text[..take])?;
            self.column += take;
            text = &text[take..];
            if self.column == LINE_WIDTH {
                self.inner.write_all(CRLF)?;
                self.column = 0;
            }
        }
        Ok(())
    }

    /// Terminates a partial last line, if any, and returns the wrapped writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.column > 0 {
            self.inner.write_all(CRLF)?;
            self.column = 0;
        }
        Ok(self.inner)
    }
}

/// Streaming radix-64 encoder writing wrapped lines.
///
/// Call [`Radix64Encoder::finish`] once all input has been written; dropping
/// the encoder without it loses the final partial group.
pub struct Radix64Encoder<W: Write> {
    out: LineWrapper<W>,
    carry: [u8; 2],
    carry_len: usize,
    scratch: String,
}

impl<W: Write> Radix64Encoder<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: LineWrapper::new(inner),
            carry: [0; 2],
            carry_len: 0,
            scratch: String::new(),
        }
    }

    /// Encodes whole 3-byte groups; `groups.len()` must be a multiple of 3
    /// unless this is the final call.
    fn emit(&mut self, groups: &[u8]) -> io::Result<()> {
        if groups.is_empty() {
            return Ok(());
        }
        self.scratch.clear();
        STANDARD.encode_string(groups, &mut self.scratch);
        self.out.write_text(self.scratch.as_bytes())
    }

    /// Encodes the carry window with padding, ends the last line and returns
    /// the wrapped writer.
    pub fn finish(mut self) -> io::Result<W> {
        let carry = self.carry;
        self.emit(&carry[..self.carry_len])?;
        self.carry_len = 0;
        self.out.finish()
    }
}

impl<W: Write> Write for Radix64Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut input = buf;

        if self.carry_len > 0 {
            let need = 3 - self.carry_len;
            if input.len() < need {
                self.carry[self.carry_len..self.carry_len + input.len()].copy_from_slice(input);
                self.carry_len += input.len();
                return Ok(buf.len());
            }
            let mut group = [0u8; 3];
            group[..self.carry_len].copy_from_slice(&self.carry[..self.carry_len]);
            group[self.carry_len..].copy_from_slice(&input[..need]);
            self.carry_len = 0;
            input = &input[need..];
            self.emit(&group)?;
        }

        let whole = input.len() - input.len() % 3;
        self.emit(&input[..whole])?;

        let rest = &input[whole..];
        self.carry[..rest.len()].copy_from_slice(rest);
        self.carry_len = rest.len();

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.inner.flush()
    }
}

fn malformed(msg: impl Into<String>) -> ArmorError {
    ArmorError::user(ErrorKind::MalformedBase64, msg)
}

/// Streaming radix-64 decoder fed with body lines.
#[derive(Default)]
pub struct Radix64Decoder {
    quantum: [u8; 4],
    quantum_len: usize,
    padded: bool,
}

impl Radix64Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one body line, appending the complete quanta to `out`.
    ///
    /// Characters of an incomplete quantum are held back until the next line.
    pub fn decode_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<()> {
        for &c in line {
            if c.is_ascii_whitespace() {
                continue;
            }
            if !is_alphabet(c) && c != PAD {
                return Err(malformed(format!(
                    "invalid character {:?} in armor body",
                    char::from(c)
                )));
            }
            if self.padded {
                return Err(malformed("armor body continues after padding"));
            }
            self.quantum[self.quantum_len] = c;
            self.quantum_len += 1;
            if self.quantum_len == 4 {
                self.decode_quantum(out)?;
                self.quantum_len = 0;
            }
        }
        Ok(())
    }

    fn decode_quantum(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let q = self.quantum;
        match q.iter().position(|&c| c == PAD) {
            None => {}
            Some(2) if q[3] == PAD => self.padded = true,
            Some(3) => self.padded = true,
            Some(_) => return Err(malformed("misplaced padding in armor body")),
        }

        let mut buf = [0u8; 3];
        let n = BODY_DECODER.decode_slice(q, &mut buf).map_err(|e| {
            ArmorError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::MalformedBase64,
                format!("base64 decoding failed: {}", e),
                e,
            )
        })?;
        out.extend_from_slice(&buf[..n]);
        Ok(())
    }

    /// Checks that the body ended on a quantum boundary.
    pub fn finish(self) -> Result<()> {
        if self.quantum_len != 0 {
            return Err(malformed(format!(
                "armor body length is not a multiple of 4 ({} trailing characters)",
                self.quantum_len
            )));
        }
        Ok(())
    }
}
