//! Dispatcher: encrypt, authorize, deliver, classify.

use std::sync::Arc;

use webpush_envelope::{KeyMaterial, MessageEncryptor, VapidSigner};

use crate::config::PushConfig;
use crate::error::{ConfigError, DispatchError};
use crate::rotation::{RotationErrorSink, RotationTask, TracingErrorSink};
use crate::status::StatusPolicy;
use crate::transport::{DeliveryHeaders, ReqwestTransport, Transport};
use crate::types::{Delivery, PushMessage, Subscription};

/// Sends push messages on behalf of one application server.
///
/// Every send recomputes ECDH, HKDF and a fresh VAPID token; nothing is cached.
pub struct Dispatcher {
    encryptor: MessageEncryptor,
    signer: VapidSigner,
    transport: Arc<dyn Transport>,
    status_policy: StatusPolicy,
    rotation: Option<RotationTask>,
}

impl Dispatcher {
    /// Build from configuration with an injected transport.
    ///
    /// Starts key rotation when the config asks for it; outside a tokio
    /// runtime that fails with [`ConfigError::Rotation`].
    pub fn new(config: &PushConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        Self::with_error_sink(config, transport, Arc::new(TracingErrorSink))
    }

    /// Like [`new`](Self::new), reporting rotation failures to `sink`.
    pub fn with_error_sink(
        config: &PushConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn RotationErrorSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let signer = VapidSigner::new(
            &config.vapid_public_key,
            &config.vapid_private_key,
            &config.vapid_subject,
        )?;

        let keys = Arc::new(KeyMaterial::generate()?);
        let rotation = config
            .key_rotation_interval
            .map(|interval| RotationTask::spawn(Arc::clone(&keys), interval, sink))
            .transpose()?;

        tracing::debug!(
            subject = %config.vapid_subject,
            rotation_secs = ?config.key_rotation_interval.map(|d| d.as_secs()),
            check_status = config.check_status_code,
            "push dispatcher ready"
        );

        Ok(Self {
            encryptor: MessageEncryptor::new(keys),
            signer,
            transport,
            status_policy: StatusPolicy::from_flag(config.check_status_code),
            rotation,
        })
    }

    /// Build with a [`ReqwestTransport`] honoring `config.request_timeout`.
    pub fn with_reqwest(config: &PushConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Self::new(config, Arc::new(transport))
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.status_policy
    }

    pub fn key_material(&self) -> &Arc<KeyMaterial> {
        self.encryptor.key_material()
    }

    pub fn signer(&self) -> &VapidSigner {
        &self.signer
    }

    /// Encrypt `message` for `subscription` and deliver it.
    ///
    /// On success returns the status the push service answered; with
    /// [`StatusPolicy::Disabled`] that status may be anything.
    pub async fn send(
        &self,
        subscription: &Subscription,
        message: &PushMessage,
    ) -> Result<Delivery, DispatchError> {
        let endpoint = subscription.endpoint.as_str();

        let record = self.encryptor.encrypt(
            &subscription.keys.auth,
            &subscription.keys.p256dh,
            &message.payload,
        )?;
        let authorization = self.signer.header(endpoint)?;

        let headers = DeliveryHeaders {
            authorization,
            urgency: message.urgency,
            ttl: message.ttl,
        };
        let record_len = record.len();

        let status = self
            .transport
            .deliver(endpoint, &headers, record.into_bytes())
            .await
            .map_err(|source| {
                tracing::warn!(endpoint, error = %source, "push delivery failed");
                DispatchError::Transport {
                    endpoint: endpoint.to_string(),
                    source,
                }
            })?;

        if let Err(e) = self.status_policy.check(status) {
            tracing::warn!(endpoint, status, error = %e, "push service rejected message");
            return Err(e.into());
        }

        tracing::debug!(
            endpoint,
            status,
            urgency = ?message.urgency,
            ttl_secs = headers.ttl_secs(),
            record_len,
            "push message delivered"
        );

        Ok(Delivery { status, record_len })
    }

    /// Stop key rotation, if running.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.rotation.take() {
            task.shutdown().await;
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("signer", &self.signer)
            .field("status_policy", &self.status_policy)
            .field("rotating", &self.rotation.is_some())
            .finish_non_exhaustive()
    }
}
