//! File and standard stream plumbing around the codec
//!
//! Input comes from a file or standard input, output goes to standard output
//! or to a file. File output is written to a temporary file next to the target
//! and renamed into place only once the codec succeeded, so a failed decode
//! never leaves a partial file behind.

use crate::armor::ArmorInfo;
use crate::codec::{self, DecodeOptions, EncodeOptions};
use crate::error::{ArmorError, ErrorCategory, ErrorKind, Result};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Armor the contents of `input` (standard input if `None` or `-`).
pub fn encode_file(
    input: Option<&Path>,
    output: Option<&Path>,
    options: &EncodeOptions,
) -> Result<()> {
    let reader = open_input(input)?;
    with_output(output, |out| codec::encode_with(reader, out, options))
        .map_err(|e| name_input(e, input, "armor"))
}

/// Decode the first armored block of `input` (standard input if `None` or `-`).
pub fn decode_file(
    input: Option<&Path>,
    output: Option<&Path>,
    options: &DecodeOptions,
) -> Result<ArmorInfo> {
    let reader = open_input(input)?;
    with_output(output, |out| codec::decode_with(reader, out, options))
        .map_err(|e| name_input(e, input, "decode"))
}

/// Puts the input file name in front of a codec error; stdin is left unnamed.
fn name_input(err: ArmorError, input: Option<&Path>, action: &str) -> ArmorError {
    match input {
        Some(path) if path != Path::new("-") => {
            err.with_context(format!("failed to {} {}", action, path.display()))
        }
        _ => err,
    }
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        None => Ok(Box::new(io::stdin().lock())),
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdin().lock())),
        Some(path) => {
            let file = File::open(path).map_err(|e| read_error(path, e))?;
            Ok(Box::new(file))
        }
    }
}

fn with_output<T, F>(output: Option<&Path>, run: F) -> Result<T>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    match output {
        None => {
            let mut stdout = io::stdout().lock();
            run(&mut stdout)
        }
        Some(path) => write_file_atomic(path, run),
    }
}

/// Run `run` against a tempfile in the target's directory and rename it over
/// `path` if it succeeds.
fn write_file_atomic<T, F>(path: &Path, run: F) -> Result<T>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        ArmorError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to create tempfile in {}", dir.display()),
            e,
        )
    })?;

    let value = run(&mut temp_file)?;

    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a complete file.
    temp_file.flush().map_err(|e| {
        ArmorError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        ArmorError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;
    temp_file.persist(path).map_err(|e| {
        ArmorError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(value)
}

fn read_error(path: &Path, err: io::Error) -> ArmorError {
    ArmorError::io(format!("failed to open {}", path.display()), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_encode_decode_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.bin");
        let armored_path = temp_dir.path().join("plain.bin.asc");
        let decoded_path = temp_dir.path().join("decoded.bin");

        let plaintext: Vec<u8> = (0..=255).collect();
        fs::write(&plain_path, &plaintext).unwrap();

        encode_file(
            Some(&plain_path),
            Some(&armored_path),
            &EncodeOptions::default(),
        )
        .unwrap();
        let armored = fs::read_to_string(&armored_path).unwrap();
        assert!(armored.starts_with("-----BEGIN PGP MESSAGE-----\r\n"));

        let info = decode_file(
            Some(&armored_path),
            Some(&decoded_path),
            &DecodeOptions::default(),
        )
        .unwrap();
        assert_eq!(info.block_type, "PGP MESSAGE");
        assert_eq!(fs::read(&decoded_path).unwrap(), plaintext);
    }

    #[test]
    fn test_failed_decode_leaves_no_output_file() {
        let temp_dir = TempDir::new().unwrap();
        let armored_path = temp_dir.path().join("bad.asc");
        let decoded_path = temp_dir.path().join("decoded.bin");

        fs::write(
            &armored_path,
            "-----BEGIN PGP MESSAGE-----\r\n\r\naGVsbG8=\r\n=AAAA\r\n-----END PGP MESSAGE-----\r\n",
        )
        .unwrap();

        let err = decode_file(
            Some(&armored_path),
            Some(&decoded_path),
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::ChecksumMismatch));
        assert!(!decoded_path.exists());
        // the tempfile is cleaned up as well
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_codec_error_names_input_file() {
        let temp_dir = TempDir::new().unwrap();
        let armored_path = temp_dir.path().join("tampered.asc");
        let decoded_path = temp_dir.path().join("decoded.bin");

        fs::write(
            &armored_path,
            "-----BEGIN PGP MESSAGE-----\r\n\r\naGVsbW8=\r\n=R/WK\r\n-----END PGP MESSAGE-----\r\n",
        )
        .unwrap();

        let err = decode_file(
            Some(&armored_path),
            Some(&decoded_path),
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::ChecksumMismatch));
        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(
            err.message(),
            format!("failed to decode {}", armored_path.display())
        );
        let source = err.source_error().expect("codec error kept as source");
        assert!(source.to_string().starts_with("checksum mismatch"));
    }

    #[test]
    fn test_failed_decode_keeps_existing_output() {
        let temp_dir = TempDir::new().unwrap();
        let armored_path = temp_dir.path().join("bad.asc");
        let decoded_path = temp_dir.path().join("decoded.bin");

        fs::write(&armored_path, "no armor here\n").unwrap();
        fs::write(&decoded_path, b"previous").unwrap();

        let err = decode_file(
            Some(&armored_path),
            Some(&decoded_path),
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MissingBeginMarker));
        assert_eq!(fs::read(&decoded_path).unwrap(), b"previous");
    }

    #[test]
    fn test_missing_input_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.bin");
        let output = temp_dir.path().join("out.asc");

        let err = encode_file(Some(&missing), Some(&output), &EncodeOptions::default())
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.kind, Some(ErrorKind::Io));
        assert!(!output.exists());
    }
}
