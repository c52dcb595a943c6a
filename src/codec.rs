//! Streaming encode/decode entry points
//!
//! `encode` reads the input in fixed-size chunks and writes armor as it goes.
//! `decode` is two-phase: the armor is parsed, decoded and verified into a
//! staging area first, and the output only sees the body once every check has
//! passed. A failed decode never writes to the output.

use std::io::{self, BufReader, BufWriter, Read, Write};

use log::debug;

use crate::armor::{self, ArmorInfo, ArmorWriter, DEFAULT_BLOCK_TYPE, Headers};
use crate::error::{ArmorError, Result};
use crate::staging::Staging;

/// Size of the reads issued against the input while encoding.
pub const CHUNK_SIZE: usize = 4096;

/// Decoded bytes kept in memory before staging moves to a temporary file.
pub const DEFAULT_SPOOL_THRESHOLD: usize = 8 * 1024 * 1024;

/// Block type and headers for the armor produced by [`encode_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    block_type: String,
    headers: Headers,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_type(mut self, block_type: impl Into<String>) -> Self {
        self.block_type = block_type.into();
        self
    }

    /// Appends a header, or replaces the value of an existing one.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn get_block_type(&self) -> &str {
        &self.block_type
    }

    pub fn get_headers(&self) -> &Headers {
        &self.headers
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            block_type: DEFAULT_BLOCK_TYPE.to_string(),
            headers: Headers::new(),
        }
    }
}

/// How strictly [`decode_with`] treats its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    strict_block_type: bool,
    require_checksum: bool,
    spool_threshold: usize,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `BlockTypeMismatch` when the END line names another block type.
    pub fn strict_block_type(mut self, strict: bool) -> Self {
        self.strict_block_type = strict;
        self
    }

    /// Accept armor without a checksum line when `false`. A checksum that is
    /// present is verified either way.
    pub fn require_checksum(mut self, require: bool) -> Self {
        self.require_checksum = require;
        self
    }

    pub fn spool_threshold(mut self, bytes: usize) -> Self {
        self.spool_threshold = bytes;
        self
    }

    pub fn is_strict_block_type(&self) -> bool {
        self.strict_block_type
    }

    pub fn requires_checksum(&self) -> bool {
        self.require_checksum
    }

    pub fn get_spool_threshold(&self) -> usize {
        self.spool_threshold
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_block_type: false,
            require_checksum: true,
            spool_threshold: DEFAULT_SPOOL_THRESHOLD,
        }
    }
}

/// Armors `input` as a `PGP MESSAGE` without headers.
pub fn encode<R: Read, W: Write>(input: R, output: W) -> Result<()> {
    encode_with(input, output, &EncodeOptions::default())
}

pub fn encode_with<R: Read, W: Write>(
    mut input: R,
    output: W,
    options: &EncodeOptions,
) -> Result<()> {
    let mut writer = ArmorWriter::new(
        BufWriter::new(output),
        options.get_block_type(),
        options.get_headers(),
    )?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total: u64 = 0;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArmorError::io("failed to read input", e)),
        };
        writer
            .write_body(&buf[..n])
            .map_err(|e| ArmorError::io("failed to write armored output", e))?;
        total += n as u64;
    }

    let mut output = writer
        .finish()
        .map_err(|e| ArmorError::io("failed to write armored output", e))?;
    output
        .flush()
        .map_err(|e| ArmorError::io("failed to flush armored output", e))?;

    debug!("armored {} bytes as {}", total, options.get_block_type());
    Ok(())
}

/// Decodes the first armored block in `input` with default options.
pub fn decode<R: Read, W: Write>(input: R, output: W) -> Result<()> {
    decode_with(input, output, &DecodeOptions::default()).map(|_| ())
}

pub fn decode_with<R: Read, W: Write>(
    input: R,
    mut output: W,
    options: &DecodeOptions,
) -> Result<ArmorInfo> {
    let mut staging = Staging::new(options.get_spool_threshold());
    let info = armor::dearmor(BufReader::new(input), &mut staging, options)?;

    let staged = staging.len();
    let spooled = staging.is_spooled();
    staging
        .copy_to(&mut output)
        .map_err(|e| ArmorError::io("failed to write decoded output", e))?;
    output
        .flush()
        .map_err(|e| ArmorError::io("failed to flush decoded output", e))?;

    debug!(
        "emitted {} verified bytes{}",
        staged,
        if spooled { " via temporary file" } else { "" }
    );
    Ok(info)
}
