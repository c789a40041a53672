//! Core types: Subscription, PushMessage, Urgency, Delivery.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ParseUrgencyError;

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A browser push subscription, in the shape of `PushSubscription.toJSON()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Receiver public key, base64 (65 bytes decoded).
    pub p256dh: String,
    /// Auth secret, base64 (16 bytes decoded).
    pub auth: String,
}

impl Subscription {
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl fmt::Debug for SubscriptionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionKeys")
            .field("p256dh", &self.p256dh)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// RFC 8030 urgency, from least to most battery-hungry delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    /// On power and Wi-Fi.
    VeryLow,
    /// On either power or Wi-Fi.
    Low,
    /// On neither power nor Wi-Fi.
    Normal,
    /// Low battery.
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very-low",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ParseUrgencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "very-low" => Ok(Self::VeryLow),
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(ParseUrgencyError(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Plaintext payload plus delivery parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushMessage {
    pub payload: Vec<u8>,
    /// `None` omits the `Urgency` header.
    pub urgency: Option<Urgency>,
    /// Sent as whole seconds in the `TTL` header.
    pub ttl: Duration,
}

impl PushMessage {
    pub fn new(payload: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            payload: payload.into(),
            urgency: None,
            ttl,
        }
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// What the push service answered to an accepted send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    /// Bytes of the encrypted body.
    pub record_len: usize,
}
