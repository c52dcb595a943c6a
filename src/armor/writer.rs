use std::io::{self, Write};

use super::{BEGIN_PREFIX, DASHES, END_PREFIX, HEADER_SEPARATOR, Headers, validate};
use crate::crc24::Crc24;
use crate::error::{ArmorError, Result};
use crate::radix64::{CRLF, Radix64Encoder};

/// Streaming armor encoder.
///
/// The BEGIN line and headers are written on construction, body bytes are
/// written through [`ArmorWriter::write_body`] (or the `Write` impl), and
/// [`ArmorWriter::finish`] emits the checksum and END lines.
pub struct ArmorWriter<W: Write> {
    block_type: String,
    crc: Crc24,
    body: Radix64Encoder<W>,
}

impl<W: Write> ArmorWriter<W> {
    /// Validates the framing and writes everything up to the blank separator line.
    pub fn new(mut writer: W, block_type: &str, headers: &Headers) -> Result<Self> {
        validate(block_type, headers)?;
        write_header(&mut writer, block_type, headers)
            .map_err(|e| ArmorError::io("failed to write armor header", e))?;

        Ok(Self {
            block_type: block_type.to_string(),
            crc: Crc24::new(),
            body: Radix64Encoder::new(writer),
        })
    }

    pub fn write_body(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.crc.update(bytes);
        self.body.write_all(bytes)
    }

    /// Flushes the last body line, then writes the checksum and END lines.
    pub fn finish(self) -> io::Result<W> {
        let mut writer = self.body.finish()?;
        writer.write_all(b"=")?;
        writer.write_all(self.crc.encoded().as_bytes())?;
        writer.write_all(CRLF)?;
        writer.write_all(END_PREFIX.as_bytes())?;
        writer.write_all(self.block_type.as_bytes())?;
        writer.write_all(DASHES.as_bytes())?;
        writer.write_all(CRLF)?;
        Ok(writer)
    }
}

impl<W: Write> Write for ArmorWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.body.flush()
    }
}

fn write_header<W: Write>(writer: &mut W, block_type: &str, headers: &Headers) -> io::Result<()> {
    writer.write_all(BEGIN_PREFIX.as_bytes())?;
    writer.write_all(block_type.as_bytes())?;
    writer.write_all(DASHES.as_bytes())?;
    writer.write_all(CRLF)?;

    for (key, value) in headers.iter() {
        writer.write_all(key.as_bytes())?;
        writer.write_all(HEADER_SEPARATOR.as_bytes())?;
        writer.write_all(value.as_bytes())?;
        writer.write_all(CRLF)?;
    }

    // separates headers from the body, even without headers
    writer.write_all(CRLF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn armor(body: &[u8], block_type: &str, headers: &Headers) -> String {
        let mut writer = ArmorWriter::new(Vec::new(), block_type, headers).unwrap();
        writer.write_body(body).unwrap();
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(
            armor(b"", "PGP MESSAGE", &Headers::new()),
            "-----BEGIN PGP MESSAGE-----\r\n\r\n=twTO\r\n-----END PGP MESSAGE-----\r\n"
        );
    }

    #[test]
    fn test_hello() {
        assert_eq!(
            armor(b"hello", "PGP MESSAGE", &Headers::new()),
            "-----BEGIN PGP MESSAGE-----\r\n\r\naGVsbG8=\r\n=R/WK\r\n-----END PGP MESSAGE-----\r\n"
        );
    }

    #[test]
    fn test_headers_in_order() {
        let headers: Headers = [("Version", "GnuPG v2"), ("Comment", "test vector")]
            .into_iter()
            .collect();
        let text = armor(b"x", "PGP SIGNATURE", &headers);
        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(lines[0], "-----BEGIN PGP SIGNATURE-----");
        assert_eq!(lines[1], "Version: GnuPG v2");
        assert_eq!(lines[2], "Comment: test vector");
        assert_eq!(lines[3], "");
        assert_eq!(lines[lines.len() - 2], "-----END PGP SIGNATURE-----");
    }

    #[test]
    fn writes_no_doubleline() {
        let rng = &mut StdRng::seed_from_u64(0);

        for i in 0..300 {
            let buf: Vec<u8> = (0..i).map(|_| rng.r#gen()).collect();
            let text = armor(&buf, "PGP MESSAGE", &Headers::new());

            assert!(text.ends_with("-----END PGP MESSAGE-----\r\n"));
            assert!(!text.ends_with("\r\n\r\n"));
            assert_eq!(text.matches('\n').count(), text.matches("\r\n").count());

            let lines: Vec<&str> = text.split_terminator("\r\n").collect();
            assert_eq!(lines[0], "-----BEGIN PGP MESSAGE-----");
            assert_eq!(lines[1], "");
            assert_eq!(
                lines[lines.len() - 2].len(),
                5,
                "invalid checksum line: '{}'",
                lines[lines.len() - 2]
            );
            if i > 0 {
                assert!(
                    !lines[lines.len() - 3].is_empty(),
                    "last body line must not be empty"
                );
            }
            // only the separator line is blank
            assert_eq!(lines.iter().filter(|l| l.is_empty()).count(), 1);
        }
    }

    #[test]
    fn test_chunked_writes_match_single_write() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 251) as u8).collect();
        let single = armor(&data, "PGP MESSAGE", &Headers::new());

        let mut writer = ArmorWriter::new(Vec::new(), "PGP MESSAGE", &Headers::new()).unwrap();
        for chunk in data.chunks(13) {
            writer.write_all(chunk).unwrap();
        }
        let chunked = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(single, chunked);
    }
}
