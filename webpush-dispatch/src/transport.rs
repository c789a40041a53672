//! Transport: where an encrypted record goes over the wire.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ConfigError, TransportError};
use crate::types::Urgency;

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Per-request headers the transport must set besides the fixed
/// `Content-Type`, `Content-Encoding` and `Content-Length`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryHeaders {
    /// `vapid t=..., k=...`
    pub authorization: String,
    /// Omitted from the request when `None`.
    pub urgency: Option<Urgency>,
    pub ttl: Duration,
}

impl DeliveryHeaders {
    /// `TTL` header value: whole seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }
}

/// Performs the POST of one encrypted record and reports the status code.
///
/// Implementations may be called concurrently; the dispatcher adds no
/// serialization of its own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(
        &self,
        endpoint: &str,
        headers: &DeliveryHeaders,
        body: Vec<u8>,
    ) -> Result<u16, TransportError>;
}

// ---------------------------------------------------------------------------
// reqwest
// ---------------------------------------------------------------------------

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Reference transport over a pooled `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    /// Reuse an existing client (and its connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn deliver(
        &self,
        endpoint: &str,
        headers: &DeliveryHeaders,
        body: Vec<u8>,
    ) -> Result<u16, TransportError> {
        let mut request = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/octet-stream")
            .header("Content-Encoding", webpush_envelope::CONTENT_ENCODING)
            .header("Content-Length", body.len())
            .header("TTL", headers.ttl_secs())
            .header("Authorization", headers.authorization.as_str());

        if let Some(urgency) = headers.urgency {
            request = request.header("Urgency", urgency.as_str());
        }

        let response = request.body(body).send().await?;
        Ok(response.status().as_u16())
    }
}
