//! aes128gcm record format (RFC 8188 header, RFC 8291 keying)
//!
//! Format:
//!   salt[16] || rs[4, big-endian] || idlen[1] = 0x41 || keyid[65] || ciphertext+tag
//!
//! keyid = uncompressed P-256 point of the application server (sender).
//! A push message is always a single record: plaintext || 0x02, sealed.

use crate::error::RecordError;

/// Salt size.
pub const SALT_BYTES: usize = 16;

/// Record-size field width.
pub const RECORD_SIZE_BYTES: usize = 4;

/// Uncompressed SEC1 P-256 point: 0x04 || x[32] || y[32].
pub const PUBLIC_KEY_BYTES: usize = 65;

/// `idlen` marker: the key id is a 65-byte public key.
pub const KEY_LENGTH_MARKER: u8 = PUBLIC_KEY_BYTES as u8; // 0x41

/// Header: salt + rs + idlen + keyid.
pub const HEADER_BYTES: usize = SALT_BYTES + RECORD_SIZE_BYTES + 1 + PUBLIC_KEY_BYTES; // 86

/// Delimiter appended to the plaintext of the last (and only) record.
pub const PADDING_DELIMITER: u8 = 0x02;

pub const AUTH_SECRET_BYTES: usize = 16;
pub const NONCE_BYTES: usize = 12;
pub const AEAD_TAG_BYTES: usize = 16;
pub const CEK_BYTES: usize = 16;

/// Largest record a push service is required to accept.
pub const MAX_RECORD_BYTES: usize = 4096;

/// Largest plaintext that still fits a single record.
pub const MAX_PLAINTEXT_BYTES: usize = MAX_RECORD_BYTES - HEADER_BYTES - 1 - AEAD_TAG_BYTES; // 3993

/// Total record length for a plaintext of `plaintext_len` bytes.
pub const fn record_len(plaintext_len: usize) -> usize {
    HEADER_BYTES + plaintext_len + 1 + AEAD_TAG_BYTES
}

/// Borrowed view of a record header.
#[derive(Debug, Clone, Copy)]
pub struct RecordHeader<'a> {
    pub salt: &'a [u8; SALT_BYTES],
    pub record_size: u32,
    pub key_length: u8,
    pub sender_public_key: &'a [u8; PUBLIC_KEY_BYTES],
    pub ciphertext: &'a [u8],
}

pub fn decode_header(data: &[u8]) -> Result<RecordHeader<'_>, RecordError> {
    if data.len() < HEADER_BYTES {
        return Err(RecordError::Truncated);
    }

    let rs_start = SALT_BYTES;
    let idlen_at = rs_start + RECORD_SIZE_BYTES;
    let key_start = idlen_at + 1;

    let key_length = data[idlen_at];
    if key_length != KEY_LENGTH_MARKER {
        return Err(RecordError::KeyLength(key_length));
    }

    let salt: &[u8; SALT_BYTES] = data[..rs_start]
        .try_into()
        .map_err(|_| RecordError::Truncated)?;

    let rs: [u8; RECORD_SIZE_BYTES] = data[rs_start..idlen_at]
        .try_into()
        .map_err(|_| RecordError::Truncated)?;

    let sender_public_key: &[u8; PUBLIC_KEY_BYTES] = data[key_start..HEADER_BYTES]
        .try_into()
        .map_err(|_| RecordError::Truncated)?;

    Ok(RecordHeader {
        salt,
        record_size: u32::from_be_bytes(rs),
        key_length,
        sender_public_key,
        ciphertext: &data[HEADER_BYTES..],
    })
}

/// Assemble a record. `sealed` is ciphertext with the tag appended.
pub fn encode_record(
    salt: &[u8; SALT_BYTES],
    sender_public_key: &[u8; PUBLIC_KEY_BYTES],
    sealed: &[u8],
) -> Vec<u8> {
    let total = HEADER_BYTES + sealed.len();
    let mut out = Vec::with_capacity(total);

    out.extend_from_slice(salt);
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.push(KEY_LENGTH_MARKER);
    out.extend_from_slice(sender_public_key);
    out.extend_from_slice(sealed);

    out
}
