//! Dispatcher configuration, from code or from the environment.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::transport::DEFAULT_REQUEST_TIMEOUT;

pub const ENV_VAPID_PUBLIC_KEY: &str = "WEBPUSH_VAPID_PUBLIC_KEY";
pub const ENV_VAPID_PRIVATE_KEY: &str = "WEBPUSH_VAPID_PRIVATE_KEY";
pub const ENV_VAPID_SUBJECT: &str = "WEBPUSH_VAPID_SUBJECT";
pub const ENV_KEY_ROTATION_SECS: &str = "WEBPUSH_KEY_ROTATION_SECS";
pub const ENV_CHECK_STATUS: &str = "WEBPUSH_CHECK_STATUS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "WEBPUSH_REQUEST_TIMEOUT_SECS";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    /// Base64 uncompressed P-256 point.
    pub vapid_public_key: String,
    /// Base64 raw P-256 scalar.
    pub vapid_private_key: String,
    /// `mailto:` or `https:` contact URI.
    pub vapid_subject: String,
    /// No rotation when `None`.
    #[serde(default, with = "opt_secs")]
    pub key_rotation_interval: Option<Duration>,
    #[serde(default = "default_true")]
    pub check_status_code: bool,
    /// Only used by the reqwest transport.
    #[serde(default = "default_timeout", with = "secs")]
    pub request_timeout: Duration,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

impl PushConfig {
    pub fn new(
        vapid_public_key: impl Into<String>,
        vapid_private_key: impl Into<String>,
        vapid_subject: impl Into<String>,
    ) -> Self {
        Self {
            vapid_public_key: vapid_public_key.into(),
            vapid_private_key: vapid_private_key.into(),
            vapid_subject: vapid_subject.into(),
            key_rotation_interval: None,
            check_status_code: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_key_rotation(mut self, interval: Duration) -> Self {
        self.key_rotation_interval = Some(interval);
        self
    }

    pub fn with_status_check(mut self, enabled: bool) -> Self {
        self.check_status_code = enabled;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read the `WEBPUSH_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let mut config = Self::new(
            required(ENV_VAPID_PUBLIC_KEY)?,
            required(ENV_VAPID_PRIVATE_KEY)?,
            required(ENV_VAPID_SUBJECT)?,
        );

        if let Some(secs) = lookup(ENV_KEY_ROTATION_SECS) {
            let secs = parse_secs(ENV_KEY_ROTATION_SECS, &secs)?;
            config.key_rotation_interval = Some(Duration::from_secs(secs));
        }

        if let Some(flag) = lookup(ENV_CHECK_STATUS) {
            config.check_status_code = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: ENV_CHECK_STATUS,
                        value: flag,
                    })
                }
            };
        }

        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout =
                Duration::from_secs(parse_secs(ENV_REQUEST_TIMEOUT_SECS, &secs)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Presence checks. Key and subject contents are validated when the
    /// dispatcher builds its signer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vapid_public_key.is_empty() {
            return Err(ConfigError::Missing("vapid_public_key"));
        }
        if self.vapid_private_key.is_empty() {
            return Err(ConfigError::Missing("vapid_private_key"));
        }
        if self.vapid_subject.is_empty() {
            return Err(ConfigError::Missing("vapid_subject"));
        }
        if self.key_rotation_interval == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid {
                var: ENV_KEY_ROTATION_SECS,
                value: "0".into(),
            });
        }
        Ok(())
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

impl fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushConfig")
            .field("vapid_public_key", &self.vapid_public_key)
            .field("vapid_private_key", &"<redacted>")
            .field("vapid_subject", &self.vapid_subject)
            .field("key_rotation_interval", &self.key_rotation_interval)
            .field("check_status_code", &self.check_status_code)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

// Durations travel as whole seconds in serialized config.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|o| o.map(Duration::from_secs))
    }
}
