//! AEAD: AES-128-GCM

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Nonce,
};
use getrandom::getrandom;

use crate::error::EncryptError;
use crate::wire::{CEK_BYTES, NONCE_BYTES, PADDING_DELIMITER, SALT_BYTES};

/// Generate a fresh record salt. Never reused across records.
pub fn salt() -> Result<[u8; SALT_BYTES], EncryptError> {
    let mut s = [0u8; SALT_BYTES];
    getrandom(&mut s).map_err(|_| EncryptError::Entropy)?;
    Ok(s)
}

/// Seal `plaintext || 0x02` as a single final record. Returns ciphertext || tag.
pub fn seal_record(
    cek: &[u8; CEK_BYTES],
    nonce: &[u8; NONCE_BYTES],
    plaintext: &[u8],
) -> Result<Vec<u8>, EncryptError> {
    let cipher = Aes128Gcm::new_from_slice(cek).map_err(|_| EncryptError::Cipher)?;

    let mut padded = zeroize::Zeroizing::new(Vec::with_capacity(plaintext.len() + 1));
    padded.extend_from_slice(plaintext);
    padded.push(PADDING_DELIMITER);

    cipher
        .encrypt(Nonce::from_slice(nonce), padded.as_slice())
        .map_err(|_| EncryptError::Cipher)
}
