//! Message encryption (RFC 8291): subscription keys + plaintext -> one aes128gcm record.

use std::sync::Arc;

use p256::PublicKey;
use zeroize::Zeroizing;

use crate::encoding::decode_fixed;
use crate::error::{EncryptError, KeyGenerationError};
use crate::keys::{ApplicationServerKeyPair, KeyMaterial};
use crate::wire::{
    self, RecordHeader, AUTH_SECRET_BYTES, MAX_PLAINTEXT_BYTES, PUBLIC_KEY_BYTES, SALT_BYTES,
};
use crate::{aead, kdf};

// ---------------------------------------------------------------------------
// Encrypted record
// ---------------------------------------------------------------------------

/// One sealed push record, ready to be sent as the request body.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    bytes: Vec<u8>,
}

impl EncryptedRecord {
    fn header(&self) -> RecordHeader<'_> {
        // Only ever built by `encode_record`, which always writes a full header.
        match wire::decode_header(&self.bytes) {
            Ok(header) => header,
            Err(_) => unreachable!("encrypted record without header"),
        }
    }

    pub fn salt(&self) -> &[u8; SALT_BYTES] {
        self.header().salt
    }

    pub fn record_size(&self) -> u32 {
        self.header().record_size
    }

    pub fn sender_public_key(&self) -> &[u8; PUBLIC_KEY_BYTES] {
        self.header().sender_public_key
    }

    /// Ciphertext followed by the 16-byte tag.
    pub fn ciphertext(&self) -> &[u8] {
        self.header().ciphertext
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for EncryptedRecord {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedRecord")
            .field("len", &self.bytes.len())
            .field("record_size", &self.record_size())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Encryptor
// ---------------------------------------------------------------------------

/// Seals plaintexts for a subscriber using the current application server key pair.
#[derive(Debug, Clone)]
pub struct MessageEncryptor {
    keys: Arc<KeyMaterial>,
}

impl MessageEncryptor {
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        Self { keys }
    }

    /// Encryptor over a freshly generated key pair.
    pub fn generate() -> Result<Self, KeyGenerationError> {
        Ok(Self::new(Arc::new(KeyMaterial::generate()?)))
    }

    pub fn key_material(&self) -> &Arc<KeyMaterial> {
        &self.keys
    }

    /// Encrypt `plaintext` for the subscription identified by its base64
    /// `auth` secret and `p256dh` receiver public key.
    pub fn encrypt(
        &self,
        auth_secret: &str,
        receiver_public_key: &str,
        plaintext: &[u8],
    ) -> Result<EncryptedRecord, EncryptError> {
        if plaintext.len() > MAX_PLAINTEXT_BYTES {
            return Err(EncryptError::PlaintextTooLong {
                len: plaintext.len(),
                max: MAX_PLAINTEXT_BYTES,
            });
        }

        let auth = Zeroizing::new(decode_fixed::<AUTH_SECRET_BYTES>(auth_secret, "auth")?);
        let receiver_raw = decode_fixed::<PUBLIC_KEY_BYTES>(receiver_public_key, "p256dh")?;
        let receiver = PublicKey::from_sec1_bytes(&receiver_raw)
            .map_err(|_| EncryptError::InvalidReceiverKey)?;

        self.keys.with_key_pair(|pair| {
            let salt = aead::salt()?;
            seal(pair, &salt, &auth, &receiver_raw, &receiver, plaintext)
        })
    }
}

/// Deterministic core of [`MessageEncryptor::encrypt`]: explicit key pair and salt.
pub(crate) fn seal(
    pair: &ApplicationServerKeyPair,
    salt: &[u8; SALT_BYTES],
    auth_secret: &[u8; AUTH_SECRET_BYTES],
    receiver_raw: &[u8; PUBLIC_KEY_BYTES],
    receiver: &PublicKey,
    plaintext: &[u8],
) -> Result<EncryptedRecord, EncryptError> {
    let shared = pair.agree(receiver);

    let info = kdf::key_info(receiver_raw, pair.public_key());
    let ikm = kdf::derive_ikm(auth_secret, shared.raw_secret_bytes().as_slice(), &info)?;
    let keys = kdf::derive_content_keys(salt, &ikm)?;

    let sealed = aead::seal_record(&keys.cek, &keys.nonce, plaintext)?;

    Ok(EncryptedRecord {
        bytes: wire::encode_record(salt, pair.public_key(), &sealed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{record_len, HEADER_BYTES};

    // RFC 8291 Appendix A.
    const AS_PRIVATE: &str = "c9f58f89813e9f8e872e71f42aa64e1757c9254dcc62b72ddc010bb4043ea11c";
    const UA_PUBLIC: &str =
        "BCVxsr7N_eNgVRqvHtD0zTZsEc6-VV-JvLexhqUzORcxaOzi6-AYWXvTBHm4bjyPjs7Vd8pZGH6SRpkNtoIAiw4";
    const AUTH: &str = "BTBZMqHH6r4Tts7J_aSIgg";
    const SALT: &str = "0c6bfaadad67958803092d454676f397";
    const PLAINTEXT: &[u8] = b"When I grow up, I want to be a watermelon";
    // Appendix A body with the record size field carrying the actual record
    // length (144) instead of the example's 4096.
    const BODY: &str = "0c6bfaadad67958803092d454676f397000000904104fe33f4ab0dea71914db55823f73b54948f41306d920732dbb9a59a53286482200e597a7b7bc260ba1c227998580992e93973002f3012a28ae8f06bbb78e5ec0ff297de5b429bba7153d3a4ae0caa091fd425f3b4b5414add8ab37a19c1bbb05cf5cb5b2a2e0562d558635641ec52812c6c8ff42e95ccb86be7cd";

    fn encryptor() -> MessageEncryptor {
        let km = KeyMaterial::from_private_key(&hex::decode(AS_PRIVATE).unwrap()).unwrap();
        MessageEncryptor::new(Arc::new(km))
    }

    #[test]
    fn rfc8291_known_answer() {
        let enc = encryptor();
        let auth: [u8; 16] = decode_fixed(AUTH, "auth").unwrap();
        let ua_raw: [u8; 65] = decode_fixed(UA_PUBLIC, "p256dh").unwrap();
        let ua = PublicKey::from_sec1_bytes(&ua_raw).unwrap();
        let salt: [u8; 16] = hex::decode(SALT).unwrap().try_into().unwrap();

        let record = enc
            .key_material()
            .with_key_pair(|pair| seal(pair, &salt, &auth, &ua_raw, &ua, PLAINTEXT))
            .unwrap();

        assert_eq!(hex::encode(record.as_bytes()), BODY);
        assert_eq!(record.record_size(), 144);
    }

    #[test]
    fn record_length_law() {
        let enc = encryptor();
        for len in [0usize, 1, 41, 1000, MAX_PLAINTEXT_BYTES] {
            let record = enc.encrypt(AUTH, UA_PUBLIC, &vec![0x5a; len]).unwrap();
            assert_eq!(record.len(), HEADER_BYTES + len + 1 + 16);
            assert_eq!(record.len(), record_len(len));
            assert_eq!(record.record_size() as usize, record.len());
            assert_eq!(&record.as_bytes()[..16], record.salt());
        }
    }

    #[test]
    fn plaintext_bound() {
        let enc = encryptor();
        assert!(enc.encrypt(AUTH, UA_PUBLIC, &[0u8; 3993]).is_ok());
        assert_eq!(
            enc.encrypt(AUTH, UA_PUBLIC, &[0u8; 3994]).unwrap_err(),
            EncryptError::PlaintextTooLong { len: 3994, max: 3993 }
        );
    }

    #[test]
    fn fresh_salt_per_call() {
        let enc = encryptor();
        let a = enc.encrypt(AUTH, UA_PUBLIC, PLAINTEXT).unwrap();
        let b = enc.encrypt(AUTH, UA_PUBLIC, PLAINTEXT).unwrap();
        assert_ne!(a.salt(), b.salt());
        assert_ne!(a.ciphertext(), b.ciphertext());
        assert_eq!(a.sender_public_key(), b.sender_public_key());

        // Same key pair and subscription, so only the salt separates the nonces.
        let auth: [u8; 16] = decode_fixed(AUTH, "auth").unwrap();
        let ua_raw: [u8; 65] = decode_fixed(UA_PUBLIC, "p256dh").unwrap();
        let ua = PublicKey::from_sec1_bytes(&ua_raw).unwrap();
        let (keys_a, keys_b) = enc.key_material().with_key_pair(|pair| {
            let shared = pair.agree(&ua);
            let info = kdf::key_info(&ua_raw, pair.public_key());
            let ikm = kdf::derive_ikm(&auth, shared.raw_secret_bytes().as_slice(), &info).unwrap();
            (
                kdf::derive_content_keys(a.salt(), &ikm).unwrap(),
                kdf::derive_content_keys(b.salt(), &ikm).unwrap(),
            )
        });
        assert_ne!(keys_a.nonce, keys_b.nonce);
        assert_ne!(*keys_a.cek, *keys_b.cek);
    }

    #[test]
    fn input_errors() {
        let enc = encryptor();

        let err = enc.encrypt("###", UA_PUBLIC, b"x").unwrap_err();
        assert_eq!(err, EncryptError::InvalidKeyEncoding("auth"));
        assert!(err.is_input_error());

        let err = enc.encrypt(AUTH, AUTH, b"x").unwrap_err();
        assert!(matches!(err, EncryptError::InvalidKeyLength { field: "p256dh", .. }));

        // 65 bytes with the uncompressed prefix, but not on the curve.
        let mut off_curve = [0x01u8; 65];
        off_curve[0] = 0x04;
        let off_curve = crate::encoding::encode_url_safe(&off_curve);
        let err = enc.encrypt(AUTH, &off_curve, b"x").unwrap_err();
        assert_eq!(err, EncryptError::InvalidReceiverKey);
    }

    #[test]
    fn rotation_changes_embedded_sender_key() {
        let enc = encryptor();
        let before = enc.encrypt(AUTH, UA_PUBLIC, PLAINTEXT).unwrap();
        enc.key_material().rotate().unwrap();
        let after = enc.encrypt(AUTH, UA_PUBLIC, PLAINTEXT).unwrap();
        assert_ne!(before.sender_public_key(), after.sender_public_key());
        assert_eq!(after.sender_public_key(), &enc.key_material().current_public_key());
    }
}
