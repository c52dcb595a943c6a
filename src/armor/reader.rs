use std::io::{BufRead, Write};
use std::str;

use log::{debug, trace, warn};

use super::{ArmorInfo, BEGIN_PREFIX, DASHES, END_PREFIX, HEADER_SEPARATOR, Headers};
use crate::codec::DecodeOptions;
use crate::crc24::{self, Crc24};
use crate::error::{ArmorError, ErrorKind, Result};
use crate::radix64::Radix64Decoder;

/// Line source that can hand the most recent line out a second time.
struct Lines<R: BufRead> {
    input: R,
    line: Vec<u8>,
    replay: bool,
    number: u64,
}

impl<R: BufRead> Lines<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            line: Vec::new(),
            replay: false,
            number: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<&[u8]>> {
        if self.replay {
            self.replay = false;
            return Ok(Some(&self.line));
        }
        self.line.clear();
        let n = self
            .input
            .read_until(b'\n', &mut self.line)
            .map_err(|e| ArmorError::io("failed to read armored input", e))?;
        if n == 0 {
            return Ok(None);
        }
        self.number += 1;
        Ok(Some(&self.line))
    }

    fn unread(&mut self) {
        self.replay = true;
    }
}

/// Returns the block type of a BEGIN line, if `line` is one.
fn parse_begin(line: &[u8]) -> Option<String> {
    let typ = line
        .trim_ascii()
        .strip_prefix(BEGIN_PREFIX.as_bytes())?
        .strip_suffix(DASHES.as_bytes())?;
    if typ.is_empty() {
        return None;
    }
    str::from_utf8(typ).ok().map(String::from)
}

/// Returns the block type of an END line, if `line` is one.
fn parse_end(line: &[u8]) -> Option<String> {
    let line = line.trim_ascii();
    let rest = line.strip_prefix(END_PREFIX.trim_end().as_bytes())?;
    let typ = rest.strip_suffix(DASHES.as_bytes()).unwrap_or(rest).trim_ascii();
    Some(String::from_utf8_lossy(typ).into_owned())
}

/// Splits a `key: value` header line. A bare `key:` has an empty value.
///
/// Indentation before the key is dropped, as it is for BEGIN lines; the value
/// is kept as written up to the line terminator.
fn parse_header(line: &[u8]) -> Option<(String, String)> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = str::from_utf8(line.trim_ascii_start()).ok()?;

    let (key, value) = match line.split_once(HEADER_SEPARATOR) {
        Some(pair) => pair,
        None => (line.strip_suffix(':')?, ""),
    };
    if key.is_empty() || key.contains(':') {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

fn unterminated(msg: impl Into<String>) -> ArmorError {
    ArmorError::user(ErrorKind::UnterminatedArmor, msg)
}

/// Parses the first armored block in `input`, writing its decoded body to `body`.
///
/// Lines before the BEGIN line are skipped. A BEGIN line followed by something
/// that is neither a header nor the blank separator is treated as ordinary text
/// and the search continues. Body bytes reach `body` before the checksum has
/// been verified, so callers must treat it as provisional until this returns `Ok`.
pub fn dearmor<R: BufRead, S: Write>(
    input: R,
    body: &mut S,
    options: &DecodeOptions,
) -> Result<ArmorInfo> {
    let mut lines = Lines::new(input);

    let (block_type, headers) = 'scan: loop {
        let block_type = loop {
            let Some(line) = lines.next_line()? else {
                return Err(ArmorError::user(
                    ErrorKind::MissingBeginMarker,
                    "no armor BEGIN line found in input",
                ));
            };
            if let Some(typ) = parse_begin(line) {
                break typ;
            }
            trace!("skipping line {} outside of armor", lines.number);
        };
        debug!("found BEGIN {} on line {}", block_type, lines.number);

        let mut headers = Headers::new();
        loop {
            let Some(line) = lines.next_line()? else {
                return Err(unterminated("input ended inside armor headers"));
            };
            if line.trim_ascii().is_empty() {
                break 'scan (block_type, headers);
            }
            match parse_header(line) {
                Some((key, value)) => headers.insert(key, value),
                None => {
                    debug!(
                        "line {} is not an armor header, resuming search for BEGIN",
                        lines.number
                    );
                    lines.unread();
                    continue 'scan;
                }
            }
        }
    };

    let mut decoder = Radix64Decoder::new();
    let mut crc = Crc24::new();
    let mut decoded = Vec::new();
    let mut total: u64 = 0;

    let checksum = loop {
        let Some(line) = lines.next_line()? else {
            return Err(unterminated("input ended inside armor body"));
        };
        let line = line.trim_ascii();
        if line.starts_with(END_PREFIX.trim_end().as_bytes()) {
            lines.unread();
            break None;
        }
        if let Some(encoded) = line.strip_prefix(b"=") {
            let value = crc24::parse_encoded(encoded).ok_or_else(|| {
                ArmorError::user(
                    ErrorKind::MalformedChecksum,
                    format!("malformed checksum line on line {}", lines.number),
                )
            })?;
            break Some(value);
        }

        decoded.clear();
        decoder.decode_line(line, &mut decoded)?;
        crc.update(&decoded);
        total += decoded.len() as u64;
        body.write_all(&decoded)
            .map_err(|e| ArmorError::io("failed to stage decoded body", e))?;
    };
    decoder.finish()?;

    match checksum {
        Some(expected) if expected != crc.value() => {
            return Err(ArmorError::user(
                ErrorKind::ChecksumMismatch,
                format!(
                    "checksum mismatch: armor declares {:06X}, body hashes to {:06X}",
                    expected,
                    crc.value()
                ),
            ));
        }
        Some(_) => {}
        None if options.requires_checksum() => {
            return Err(ArmorError::user(
                ErrorKind::MissingChecksum,
                "armor has no checksum line",
            ));
        }
        None => warn!("armor has no checksum line, body is not integrity checked"),
    }

    let end_type = loop {
        let Some(line) = lines.next_line()? else {
            return Err(unterminated(format!(
                "input ended before END {} line",
                block_type
            )));
        };
        if line.trim_ascii().is_empty() {
            continue;
        }
        match parse_end(line) {
            Some(typ) => break typ,
            None => {
                return Err(unterminated(format!(
                    "expected END {} on line {}",
                    block_type, lines.number
                )));
            }
        }
    };

    if end_type != block_type {
        if options.is_strict_block_type() {
            return Err(ArmorError::user(
                ErrorKind::BlockTypeMismatch,
                format!(
                    "armor BEGIN {} does not match END {}",
                    block_type, end_type
                ),
            ));
        }
        warn!("armor BEGIN {} closed by END {}", block_type, end_type);
    }

    debug!(
        "decoded {} body bytes from {} armor with {} headers",
        total,
        block_type,
        headers.len()
    );
    Ok(ArmorInfo {
        block_type,
        headers,
    })
}
