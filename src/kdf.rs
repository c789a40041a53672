//! KDF chain (RFC 8291 §3.3, §3.4; RFC 8188 §2.2)
//!
//! key_info   = "WebPush: info" || 0x00 || ua_public[65] || as_public[65]
//! PRK_key    = HKDF-Extract(salt=auth_secret, IKM=ecdh_secret)
//! IKM        = HKDF-Expand(PRK_key, key_info, 32)
//! PRK        = HKDF-Extract(salt=record_salt, IKM)
//! CEK        = HKDF-Expand(PRK, "Content-Encoding: aes128gcm" || 0x00, 16)
//! NONCE      = HKDF-Expand(PRK, "Content-Encoding: nonce" || 0x00, 12)

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::EncryptError;
use crate::wire::{AUTH_SECRET_BYTES, CEK_BYTES, NONCE_BYTES, PUBLIC_KEY_BYTES, SALT_BYTES};

pub const KEY_INFO_PREFIX: &[u8] = b"WebPush: info\x00";
pub const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\x00";
pub const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\x00";

pub const IKM_BYTES: usize = 32;
pub const KEY_INFO_BYTES: usize = 14 + 2 * PUBLIC_KEY_BYTES; // 144

/// Per-record content key and nonce.
pub struct ContentKeys {
    pub cek: Zeroizing<[u8; CEK_BYTES]>,
    pub nonce: [u8; NONCE_BYTES],
}

pub fn key_info(
    receiver_public_key: &[u8; PUBLIC_KEY_BYTES],
    sender_public_key: &[u8; PUBLIC_KEY_BYTES],
) -> [u8; KEY_INFO_BYTES] {
    let mut info = [0u8; KEY_INFO_BYTES];
    let (prefix, keys) = info.split_at_mut(KEY_INFO_PREFIX.len());
    prefix.copy_from_slice(KEY_INFO_PREFIX);
    keys[..PUBLIC_KEY_BYTES].copy_from_slice(receiver_public_key);
    keys[PUBLIC_KEY_BYTES..].copy_from_slice(sender_public_key);
    info
}

pub fn derive_ikm(
    auth_secret: &[u8; AUTH_SECRET_BYTES],
    ecdh_secret: &[u8],
    key_info: &[u8; KEY_INFO_BYTES],
) -> Result<Zeroizing<[u8; IKM_BYTES]>, EncryptError> {
    let hk = Hkdf::<Sha256>::new(Some(auth_secret.as_slice()), ecdh_secret);
    let mut ikm = Zeroizing::new([0u8; IKM_BYTES]);
    hk.expand(key_info, &mut ikm[..]).map_err(|_| EncryptError::Cipher)?;
    Ok(ikm)
}

pub fn derive_content_keys(
    salt: &[u8; SALT_BYTES],
    ikm: &[u8; IKM_BYTES],
) -> Result<ContentKeys, EncryptError> {
    let hk = Hkdf::<Sha256>::new(Some(salt.as_slice()), ikm);

    let mut cek = Zeroizing::new([0u8; CEK_BYTES]);
    hk.expand(CEK_INFO, &mut cek[..]).map_err(|_| EncryptError::Cipher)?;

    let mut nonce = [0u8; NONCE_BYTES];
    hk.expand(NONCE_INFO, &mut nonce).map_err(|_| EncryptError::Cipher)?;

    Ok(ContentKeys { cek, nonce })
}
