//! # Web Push envelope
//!
//! Message encryption for Web Push (RFC 8291, `aes128gcm`) and the VAPID
//! `Authorization` header (RFC 8292).
//!
//! ## Quick Start
//!
//! ```rust
//! use webpush_envelope::{MessageEncryptor, VapidSigner};
//!
//! // From the browser's PushSubscription.
//! let p256dh = "BCVxsr7N_eNgVRqvHtD0zTZsEc6-VV-JvLexhqUzORcxaOzi6-AYWXvTBHm4bjyPjs7Vd8pZGH6SRpkNtoIAiw4";
//! let auth = "BTBZMqHH6r4Tts7J_aSIgg";
//!
//! let encryptor = MessageEncryptor::generate().unwrap();
//! let record = encryptor.encrypt(auth, p256dh, b"hello").unwrap();
//! assert_eq!(record.len(), 86 + 5 + 1 + 16);
//!
//! let signer = VapidSigner::new(
//!     "BIRM67G3W1fva-ephDo220BbiaOOy-SBk2uzHsmlqMXp_OmkKxYW96cOK5EWnKdkLg2i7N4FYfuxIwm7JWThVSY",
//!     "QxfAyO5dMMrSvDT2_xHxW5aktYPWGE_hT42RKlHilpQ",
//!     "mailto:webpush@example.com",
//! )
//! .unwrap();
//! let authorization = signer.header("https://push.example.com/abc").unwrap();
//! assert!(authorization.starts_with("vapid t="));
//! ```
//!
//! ## Properties
//!
//! - **Single record**: every message is one record, `plaintext || 0x02`
//! - **Fresh keying**: new salt per message, so CEK and nonce never repeat
//! - **Consistent sender key**: rotation never tears a seal in progress
//!
//! ## What's NOT Provided
//!
//! - Decryption (user agent side)
//! - Subscription storage
//! - HTTP delivery (see `webpush-dispatch`)

#![deny(unsafe_code)]

// ---------------------------------------------------------------------------
// Internal modules
// ---------------------------------------------------------------------------

mod aead;
mod encryptor;
mod error;
mod kdf;
mod keys;
mod vapid;

// Record layout and key encodings are stable and useful to callers
// (inspection tooling, fixtures).
pub mod encoding;
pub mod wire;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

pub use encryptor::{EncryptedRecord, MessageEncryptor};
pub use error::{EncryptError, KeyGenerationError, RecordError, VapidError};
pub use keys::{ApplicationServerKeyPair, KeyMaterial};
pub use vapid::{audience, VapidClaims, VapidKeys, VapidSigner, TOKEN_LIFETIME_HOURS};
pub use wire::MAX_PLAINTEXT_BYTES;

/// Content-Encoding token for this record format.
pub const CONTENT_ENCODING: &str = "aes128gcm";
