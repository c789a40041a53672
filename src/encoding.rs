//! Base64 handling for subscription and VAPID keys.
//!
//! Browsers hand out `p256dh` and `auth` as unpadded base64url, but keys
//! copied through other tooling arrive padded or in the standard alphabet.
//! The alphabet is picked from the characters present (`+`/`/` versus
//! `-`/`_`) and padding from the presence of `=`. Input using neither
//! alphabet-specific character decodes identically under both, so it goes
//! through the URL-safe engine.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::{DecodeError, Engine};

use crate::error::EncryptError;

/// Decode a key in any of the four base64 flavours.
pub fn decode_key(input: &str) -> Result<Vec<u8>, DecodeError> {
    let input = input.trim();
    let padded = input.contains('=');

    let engine = if input.contains(['+', '/']) {
        if padded {
            &STANDARD
        } else {
            &STANDARD_NO_PAD
        }
    } else if padded {
        &URL_SAFE
    } else {
        &URL_SAFE_NO_PAD
    };

    engine.decode(input)
}

/// Decode a key that must be exactly `N` bytes long.
pub(crate) fn decode_fixed<const N: usize>(
    input: &str,
    field: &'static str,
) -> Result<[u8; N], EncryptError> {
    let bytes = decode_key(input).map_err(|_| EncryptError::InvalidKeyEncoding(field))?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| EncryptError::InvalidKeyLength {
        field,
        expected: N,
        actual,
    })
}

/// Unpadded base64url, the encoding of the `k=` parameter and JWT segments.
pub fn encode_url_safe(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTH_HEX: &str = "ceacabfcf470412befaeccad43dfb460";

    #[test]
    fn accepts_all_four_flavours() {
        let expected = hex::decode(AUTH_HEX).unwrap();
        for input in [
            "zqyr_PRwQSvvrsytQ9-0YA==",
            "zqyr_PRwQSvvrsytQ9-0YA",
            "zqyr/PRwQSvvrsytQ9+0YA==",
            "zqyr/PRwQSvvrsytQ9+0YA",
        ] {
            assert_eq!(decode_key(input).unwrap(), expected, "input {}", input);
        }
    }

    #[test]
    fn neutral_alphabet_decodes() {
        // "gBOK" style strings without any alphabet-specific characters
        assert_eq!(decode_key("AAEC").unwrap(), vec![0x00, 0x01, 0x02]);
    }

    #[test]
    fn rejects_mixed_alphabets() {
        assert!(decode_key("zqyr/PRwQSvvrsytQ9-0YA").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_key("not base64!").is_err());
    }

    #[test]
    fn fixed_length_mismatch_reports_sizes() {
        let err = decode_fixed::<65>("zqyr_PRwQSvvrsytQ9-0YA", "p256dh").unwrap_err();
        assert_eq!(
            err,
            EncryptError::InvalidKeyLength {
                field: "p256dh",
                expected: 65,
                actual: 16,
            }
        );
    }

    #[test]
    fn url_safe_roundtrip() {
        let bytes = hex::decode(AUTH_HEX).unwrap();
        assert_eq!(encode_url_safe(&bytes), "zqyr_PRwQSvvrsytQ9-0YA");
    }
}
