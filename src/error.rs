//! Error types for the encryption and VAPID pipelines.

use thiserror::Error;

/// Failures producing an application server key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyGenerationError {
    #[error("entropy source failure while generating a P-256 key pair")]
    Entropy,

    #[error("private key is not a valid P-256 scalar")]
    InvalidPrivateKey,
}

/// Failures of [`MessageEncryptor::encrypt`](crate::MessageEncryptor::encrypt).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncryptError {
    #[error("plaintext too long ({len} > {max} bytes)")]
    PlaintextTooLong { len: usize, max: usize },

    #[error("{0} is not valid base64")]
    InvalidKeyEncoding(&'static str),

    #[error("{field} must decode to {expected} bytes, got {actual}")]
    InvalidKeyLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("receiver public key is not a valid P-256 point")]
    InvalidReceiverKey,

    #[error("content cipher setup failed")]
    Cipher,

    #[error("entropy source failure")]
    Entropy,
}

impl EncryptError {
    /// Caller-side input problems: fix the subscription record, never retry.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::PlaintextTooLong { .. }
                | Self::InvalidKeyEncoding(_)
                | Self::InvalidKeyLength { .. }
                | Self::InvalidReceiverKey
        )
    }
}

/// Failures of VAPID identity construction and header minting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VapidError {
    #[error("subject VAPID should be either a \"mailto:\" (email) or a \"https:\" URI")]
    InvalidSubject,

    #[error("VAPID public key is not a base64 P-256 point")]
    InvalidPublicKey,

    #[error("VAPID private key is not a base64 P-256 scalar")]
    InvalidPrivateKey,

    #[error("VAPID public key does not belong to the private key")]
    KeyMismatch,

    #[error("invalid push endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to serialize VAPID claims")]
    Claims,

    #[error("failed to sign VAPID token")]
    Signing,
}

/// Failures while reading the header of an encoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is shorter than its header")]
    Truncated,

    #[error("unsupported key length marker {0:#04x}")]
    KeyLength(u8),
}
