//! Application server ECDH identity used for message encryption.
//!
//! This key pair is unrelated to the VAPID signing identity. It travels
//! inside every record (the `keyid` field), so replacing it never breaks
//! records that were already sealed.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use getrandom::getrandom;
use p256::ecdh::{diffie_hellman, SharedSecret};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use zeroize::Zeroizing;

use crate::encoding::encode_url_safe;
use crate::error::KeyGenerationError;
use crate::wire::PUBLIC_KEY_BYTES;

// ---------------------------------------------------------------------------
// Key pair
// ---------------------------------------------------------------------------

/// ECDH P-256 key pair. The public half is always derived from the secret.
#[derive(Clone)]
pub struct ApplicationServerKeyPair {
    secret: SecretKey,
    public: [u8; PUBLIC_KEY_BYTES],
}

impl ApplicationServerKeyPair {
    /// Fresh key pair from the OS random source.
    pub fn generate() -> Result<Self, KeyGenerationError> {
        loop {
            let mut scalar = Zeroizing::new([0u8; 32]);
            getrandom(scalar.as_mut_slice()).map_err(|_| KeyGenerationError::Entropy)?;

            // Rejects zero and values >= n; retry draws a new scalar.
            if let Ok(secret) = SecretKey::from_slice(scalar.as_slice()) {
                return Ok(Self::from_secret(secret));
            }
        }
    }

    /// Key pair from a raw 32-byte big-endian scalar.
    pub fn from_private_key(bytes: &[u8]) -> Result<Self, KeyGenerationError> {
        if bytes.len() != 32 {
            return Err(KeyGenerationError::InvalidPrivateKey);
        }
        let secret =
            SecretKey::from_slice(bytes).map_err(|_| KeyGenerationError::InvalidPrivateKey)?;
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let mut public = [0u8; PUBLIC_KEY_BYTES];
        public.copy_from_slice(secret.public_key().to_encoded_point(false).as_bytes());
        Self { secret, public }
    }

    /// Uncompressed SEC1 public key (65 bytes, leading 0x04).
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_BYTES] {
        &self.public
    }

    pub(crate) fn agree(&self, receiver: &PublicKey) -> SharedSecret {
        diffie_hellman(self.secret.to_nonzero_scalar(), receiver.as_affine())
    }
}

impl fmt::Debug for ApplicationServerKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationServerKeyPair")
            .field("public", &encode_url_safe(&self.public))
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Key material (rotatable holder)
// ---------------------------------------------------------------------------

struct Held {
    pair: ApplicationServerKeyPair,
    generation: u64,
}

/// Holds the current key pair behind a read/write lock.
///
/// Encryption holds the read lock for the whole seal so the public key in
/// the record header and the ECDH math always come from the same pair.
/// Rotation builds the replacement first and takes the write lock only to
/// swap it in.
pub struct KeyMaterial {
    held: RwLock<Held>,
}

impl KeyMaterial {
    pub fn generate() -> Result<Self, KeyGenerationError> {
        Ok(Self::from_key_pair(ApplicationServerKeyPair::generate()?))
    }

    pub fn from_private_key(bytes: &[u8]) -> Result<Self, KeyGenerationError> {
        Ok(Self::from_key_pair(ApplicationServerKeyPair::from_private_key(bytes)?))
    }

    pub fn from_key_pair(pair: ApplicationServerKeyPair) -> Self {
        Self {
            held: RwLock::new(Held {
                pair,
                generation: 0,
            }),
        }
    }

    /// Replace the key pair with a freshly generated one.
    /// Returns the new generation number.
    pub fn rotate(&self) -> Result<u64, KeyGenerationError> {
        let next = ApplicationServerKeyPair::generate()?;
        // A poisoned guard still holds a whole pair; the swap below is a
        // single assignment and cannot leave it torn.
        let mut held = self.held.write().unwrap_or_else(PoisonError::into_inner);
        held.pair = next;
        held.generation += 1;
        Ok(held.generation)
    }

    pub fn current_public_key(&self) -> [u8; PUBLIC_KEY_BYTES] {
        self.with_key_pair(|pair| *pair.public_key())
    }

    /// Number of completed rotations.
    pub fn generation(&self) -> u64 {
        self.held.read().unwrap_or_else(PoisonError::into_inner).generation
    }

    /// Run `f` against one consistent key pair, holding the read lock throughout.
    pub fn with_key_pair<R>(&self, f: impl FnOnce(&ApplicationServerKeyPair) -> R) -> R {
        let held = self.held.read().unwrap_or_else(PoisonError::into_inner);
        f(&held.pair)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let held = self.held.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("KeyMaterial")
            .field("pair", &held.pair)
            .field("generation", &held.generation)
            .finish()
    }
}
