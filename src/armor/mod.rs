//! OpenPGP ASCII armor framing
//!
//! An armored block looks like this, every line terminated by CRLF:
//!
//! ```text
//! -----BEGIN PGP MESSAGE-----
//! Comment: optional headers
//!
//! aGVsbG8=
//! =R/WK
//! -----END PGP MESSAGE-----
//! ```
//!
//! The block type is carried as a plain string; framing does not depend on it.

mod reader;
mod writer;

pub use self::reader::*;
pub use self::writer::*;

use crate::codec::DecodeOptions;
use crate::error::{ArmorError, ErrorCategory, ErrorKind, Result};

/// Block type used when the caller does not name one.
pub const DEFAULT_BLOCK_TYPE: &str = "PGP MESSAGE";

const DASHES: &str = "-----";
const BEGIN_PREFIX: &str = "-----BEGIN ";
const END_PREFIX: &str = "-----END ";
const HEADER_SEPARATOR: &str = ": ";

/// Ordered armor headers.
///
/// Pairs are kept in insertion order. Inserting a key that is already
/// present (exact, case-sensitive match) replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Block type and headers of a parsed armor block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmorInfo {
    pub block_type: String,
    pub headers: Headers,
}

/// One armored unit held entirely in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmorBlock {
    pub block_type: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl ArmorBlock {
    /// A block of the default type without headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            block_type: DEFAULT_BLOCK_TYPE.to_string(),
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Renders the block as armored text.
    pub fn to_armored(&self) -> Result<String> {
        let mut writer = ArmorWriter::new(Vec::new(), &self.block_type, &self.headers)?;
        writer
            .write_body(&self.body)
            .map_err(|e| ArmorError::io("failed to armor block", e))?;
        let armored = writer
            .finish()
            .map_err(|e| ArmorError::io("failed to armor block", e))?;
        String::from_utf8(armored).map_err(|e| {
            ArmorError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::InvalidHeader,
                "armored output is not valid UTF-8",
                e,
            )
        })
    }

    /// Parses the first armored block found in `armored`, with default options.
    pub fn from_armored(armored: &[u8]) -> Result<Self> {
        let mut body = Vec::new();
        let info = dearmor(armored, &mut body, &DecodeOptions::default())?;
        Ok(Self {
            block_type: info.block_type,
            headers: info.headers,
            body,
        })
    }
}

fn invalid_header(msg: impl Into<String>) -> ArmorError {
    ArmorError::user(ErrorKind::InvalidHeader, msg)
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\r', '\n'])
}

/// Checks that a block type and its headers can be written and parsed back unchanged.
pub fn validate(block_type: &str, headers: &Headers) -> Result<()> {
    if block_type.is_empty() {
        return Err(invalid_header("block type must not be empty"));
    }
    if has_line_break(block_type) || block_type.contains(DASHES) {
        return Err(invalid_header(format!(
            "block type {:?} must not contain line breaks or runs of dashes",
            block_type
        )));
    }
    if block_type.trim() != block_type {
        return Err(invalid_header(format!(
            "block type {:?} must not have surrounding whitespace",
            block_type
        )));
    }

    for (key, value) in headers.iter() {
        if key.is_empty() || key.trim() != key {
            return Err(invalid_header(format!(
                "header key {:?} must be non-empty without surrounding whitespace",
                key
            )));
        }
        if key.contains(':') || has_line_break(key) {
            return Err(invalid_header(format!(
                "header key {:?} must not contain ':' or line breaks",
                key
            )));
        }
        if has_line_break(value) {
            return Err(invalid_header(format!(
                "value of header {:?} must not contain line breaks",
                key
            )));
        }
    }
    Ok(())
}
