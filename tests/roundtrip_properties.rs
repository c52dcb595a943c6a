//! Property tests for the armor codec

use pgparmor::{
    ArmorError, DecodeOptions, EncodeOptions, ErrorKind, Headers, decode, decode_with, encode,
    encode_with,
};
use proptest::prelude::*;

fn armor(data: &[u8]) -> String {
    let mut out = Vec::new();
    encode(data, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn dearmor(armored: &[u8]) -> Result<Vec<u8>, ArmorError> {
    let mut out = Vec::new();
    decode(armored, &mut out)?;
    Ok(out)
}

fn checksum_line(armored: &str) -> &str {
    armored
        .split("\r\n")
        .find(|line| line.starts_with('='))
        .unwrap()
}

fn header_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[A-Za-z][A-Za-z0-9-]{0,15}", "[ -~]{0,40}"), 0..6)
}

proptest! {
    #[test]
    fn roundtrip(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        let armored = armor(&data);
        prop_assert_eq!(dearmor(armored.as_bytes()).unwrap(), data);
    }

    #[test]
    fn body_lines_are_wrapped(data in prop::collection::vec(any::<u8>(), 0..1024)) {
        let armored = armor(&data);
        prop_assert!(armored.ends_with("\r\n"));
        for line in armored.split_terminator("\r\n") {
            prop_assert!(line.len() <= 64 || line.starts_with("-----"));
            prop_assert!(!line.contains('\n') && !line.contains('\r'));
        }
        prop_assert!(!armored.contains("\r\n\r\n\r\n"));
    }

    #[test]
    fn single_bit_flip_is_detected(
        data in prop::collection::vec(any::<u8>(), 1..512),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let original = armor(&data);

        let mut flipped = data.clone();
        flipped[index.index(data.len())] ^= 1 << bit;
        let forged = armor(&flipped).replace(checksum_line(&armor(&flipped)), checksum_line(&original));

        let err = dearmor(forged.as_bytes()).unwrap_err();
        prop_assert_eq!(err.kind, Some(ErrorKind::ChecksumMismatch));
    }

    #[test]
    fn headers_survive_in_order(
        headers in header_strategy(),
        data in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let headers: Headers = headers.into_iter().collect();
        let options = EncodeOptions::new().headers(headers.clone());
        let mut armored = Vec::new();
        encode_with(&data[..], &mut armored, &options).unwrap();

        let mut body = Vec::new();
        let info = decode_with(&armored[..], &mut body, &DecodeOptions::default()).unwrap();
        prop_assert_eq!(info.headers, headers);
        prop_assert_eq!(body, data);
    }

    #[test]
    fn arbitrary_input_never_panics(input in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut out = Vec::new();
        let result = decode(&input[..], &mut out);
        if result.is_err() {
            prop_assert!(out.is_empty());
        }
    }
}
