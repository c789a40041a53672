//! VAPID (RFC 8292): ES256-signed JWT identifying the application server.
//!
//! Header value: `vapid t=<jwt>, k=<base64url uncompressed public key>`
//!
//! The JWT is rebuilt on every call; its audience is the origin of the
//! push endpoint, so a token is never reused across push services.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::PublicKey;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::encoding::{decode_key, encode_url_safe};
use crate::error::VapidError;
use crate::wire::PUBLIC_KEY_BYTES;

/// Token lifetime. RFC 8292 caps it at 24 hours.
pub const TOKEN_LIFETIME_HOURS: i64 = 12;

const JWT_HEADER: &str = r#"{"typ":"JWT","alg":"ES256"}"#;

/// JWT claims. `aud` is always a single string, never an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VapidClaims {
    pub aud: String,
    pub exp: i64,
    pub sub: String,
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

pub struct VapidSigner {
    subject: String,
    public_key: String,
    signing_key: SigningKey,
}

impl VapidSigner {
    /// Validate the subject and keys. Both keys are base64 in any flavour:
    /// the public key an uncompressed P-256 point, the private key a raw
    /// 32-byte scalar. They must belong together.
    pub fn new(public_key: &str, private_key: &str, subject: &str) -> Result<Self, VapidError> {
        if !subject.starts_with("mailto:") && !subject.starts_with("https:") {
            return Err(VapidError::InvalidSubject);
        }

        let public_raw = decode_key(public_key).map_err(|_| VapidError::InvalidPublicKey)?;
        if public_raw.len() != PUBLIC_KEY_BYTES {
            return Err(VapidError::InvalidPublicKey);
        }
        let public =
            PublicKey::from_sec1_bytes(&public_raw).map_err(|_| VapidError::InvalidPublicKey)?;

        let private_raw = zeroize::Zeroizing::new(
            decode_key(private_key).map_err(|_| VapidError::InvalidPrivateKey)?,
        );
        if private_raw.len() != 32 {
            return Err(VapidError::InvalidPrivateKey);
        }
        let signing_key =
            SigningKey::from_slice(&private_raw).map_err(|_| VapidError::InvalidPrivateKey)?;

        if PublicKey::from(signing_key.verifying_key()) != public {
            return Err(VapidError::KeyMismatch);
        }

        Ok(Self {
            subject: subject.to_string(),
            public_key: encode_url_safe(&public_raw),
            signing_key,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Unpadded base64url public key, the `k=` parameter.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// `Authorization` header value for a request to `endpoint`.
    pub fn header(&self, endpoint: &str) -> Result<String, VapidError> {
        self.header_at(endpoint, Utc::now())
    }

    pub fn header_at(&self, endpoint: &str, now: DateTime<Utc>) -> Result<String, VapidError> {
        let token = self.token_at(endpoint, now)?;
        Ok(format!("vapid t={}, k={}", token, self.public_key))
    }

    /// Signed JWT valid for [`TOKEN_LIFETIME_HOURS`] from `now`.
    pub fn token_at(&self, endpoint: &str, now: DateTime<Utc>) -> Result<String, VapidError> {
        let claims = VapidClaims {
            aud: audience(endpoint)?,
            exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
            sub: self.subject.clone(),
        };
        let claims = serde_json::to_vec(&claims).map_err(|_| VapidError::Claims)?;

        let signing_input = format!(
            "{}.{}",
            encode_url_safe(JWT_HEADER.as_bytes()),
            encode_url_safe(&claims)
        );

        let signature: Signature = self
            .signing_key
            .try_sign(signing_input.as_bytes())
            .map_err(|_| VapidError::Signing)?;

        Ok(format!(
            "{}.{}",
            signing_input,
            encode_url_safe(signature.to_bytes().as_slice())
        ))
    }
}

impl fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidSigner")
            .field("subject", &self.subject)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// `scheme://host[:port]` of the push endpoint.
pub fn audience(endpoint: &str) -> Result<String, VapidError> {
    let url = Url::parse(endpoint).map_err(|e| VapidError::InvalidEndpoint(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| VapidError::InvalidEndpoint("missing host".into()))?;

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

// ---------------------------------------------------------------------------
// Key generation
// ---------------------------------------------------------------------------

/// A fresh VAPID identity, in the encodings [`VapidSigner::new`] accepts.
#[derive(Clone, Serialize, Deserialize)]
pub struct VapidKeys {
    /// Uncompressed point, unpadded base64url (65 bytes decoded).
    pub public_key: String,
    /// Raw scalar, unpadded base64url (32 bytes decoded).
    pub private_key: String,
}

impl VapidKeys {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let point = signing_key.verifying_key().to_encoded_point(false);

        Self {
            public_key: encode_url_safe(point.as_bytes()),
            private_key: encode_url_safe(signing_key.to_bytes().as_slice()),
        }
    }
}

impl fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
