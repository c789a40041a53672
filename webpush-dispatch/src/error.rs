//! Error types for delivery.

use thiserror::Error;
use webpush_envelope::{EncryptError, KeyGenerationError, VapidError};

// ---------------------------------------------------------------------------
// Construction-time errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("VAPID identity: {0}")]
    Vapid(#[from] VapidError),

    #[error("encryption keys: {0}")]
    Keys(#[from] KeyGenerationError),

    #[error("http client: {0}")]
    HttpClient(String),

    #[error("key rotation: {0}")]
    Rotation(#[from] RotationSpawnError),
}

/// Why a [`RotationTask`](crate::RotationTask) could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RotationSpawnError {
    #[error("no tokio runtime is running")]
    NoRuntime,

    #[error("interval must be non-zero")]
    ZeroInterval,
}

// ---------------------------------------------------------------------------
// Push service responses
// ---------------------------------------------------------------------------

/// Push-service semantics of a non-success status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushServiceError {
    #[error("bad request: check the subscription data and message format")]
    BadRequest,

    #[error("unauthorized: the request requires authentication")]
    Unauthorized,

    #[error("forbidden: the server understood the request, but is refusing to fulfill it")]
    Forbidden,

    #[error("subscription not found: the user may have unsubscribed or the subscription may have expired")]
    NotFound,

    #[error("subscription is no longer active: delete it from the server")]
    Gone,

    #[error("too many requests: try again later")]
    TooManyRequests,

    #[error("internal server error: try again later")]
    InternalServerError,

    #[error("service unavailable: try again later")]
    ServiceUnavailable,

    #[error("unexpected response from the server (status {0})")]
    UnexpectedResponse(u16),
}

impl PushServiceError {
    /// The subscription is dead; the caller should remove it.
    pub fn should_delete_subscription(&self) -> bool {
        matches!(self, Self::NotFound | Self::Gone)
    }

    /// Transient push-service condition; the caller may retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TooManyRequests | Self::InternalServerError | Self::ServiceUnavailable
        )
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Failure reported by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            "request timed out".to_string()
        } else if e.is_connect() {
            "connection failed".to_string()
        } else {
            "request failed".to_string()
        };
        Self::with_source(message, e)
    }
}

// ---------------------------------------------------------------------------
// Send
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("encrypting message: {0}")]
    Encrypt(#[from] EncryptError),

    #[error("building VAPID header: {0}")]
    Vapid(#[from] VapidError),

    #[error("delivering to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    PushService(#[from] PushServiceError),
}

impl DispatchError {
    pub fn push_service(&self) -> Option<PushServiceError> {
        match self {
            Self::PushService(e) => Some(*e),
            _ => None,
        }
    }

    pub fn should_delete_subscription(&self) -> bool {
        self.push_service()
            .is_some_and(|e| e.should_delete_subscription())
    }

    pub fn is_retryable(&self) -> bool {
        self.push_service().is_some_and(|e| e.is_retryable())
    }
}

/// Unknown urgency token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown urgency {0:?}: expected very-low, low, normal or high")]
pub struct ParseUrgencyError(pub String);
