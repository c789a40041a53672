//! # Web Push dispatch
//!
//! Delivers `aes128gcm` push messages with VAPID authorization and maps the
//! push service's answer onto an actionable outcome.
//!
//! Built on top of `webpush-envelope` for encryption and token signing.
//!
//! ## Quick Start
//!
//! ```ignore
//! use webpush_dispatch::*;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let config = PushConfig::from_env()?.with_key_rotation(Duration::from_secs(3600));
//! let mut dispatcher = Dispatcher::with_reqwest(&config)?;
//!
//! let subscription = Subscription::from_json(&stored_json)?;
//! let message = PushMessage::new(b"{\"title\":\"hi\"}".to_vec(), Duration::from_secs(60))
//!     .with_urgency(Urgency::High);
//!
//! match dispatcher.send(&subscription, &message).await {
//!     Ok(delivery) => println!("accepted with {}", delivery.status),
//!     Err(e) if e.should_delete_subscription() => forget(&subscription),
//!     Err(e) if e.is_retryable() => retry_later(&subscription),
//!     Err(e) => return Err(e.into()),
//! }
//!
//! dispatcher.shutdown().await;
//! # });
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod rotation;
pub mod status;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use config::PushConfig;
pub use dispatcher::Dispatcher;
pub use error::{
    ConfigError, DispatchError, ParseUrgencyError, PushServiceError, RotationSpawnError,
    TransportError,
};
pub use rotation::{InMemoryErrorSink, RotationErrorSink, RotationTask, TracingErrorSink};
pub use status::{validate_status_code, StatusPolicy};
pub use transport::{DeliveryHeaders, ReqwestTransport, Transport};
pub use types::{Delivery, PushMessage, Subscription, SubscriptionKeys, Urgency};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use webpush_envelope::wire;

    const VAPID_PUBLIC: &str =
        "BIRM67G3W1fva-ephDo220BbiaOOy-SBk2uzHsmlqMXp_OmkKxYW96cOK5EWnKdkLg2i7N4FYfuxIwm7JWThVSY";
    const VAPID_PRIVATE: &str = "QxfAyO5dMMrSvDT2_xHxW5aktYPWGE_hT42RKlHilpQ";
    const SUBJECT: &str = "mailto:ops@example.com";

    const ENDPOINT: &str = "https://push.example.com/wpush/abc";
    const P256DH: &str =
        "BCVxsr7N_eNgVRqvHtD0zTZsEc6-VV-JvLexhqUzORcxaOzi6-AYWXvTBHm4bjyPjs7Vd8pZGH6SRpkNtoIAiw4";
    const AUTH: &str = "BTBZMqHH6r4Tts7J_aSIgg";

    struct Call {
        endpoint: String,
        headers: DeliveryHeaders,
        body: Vec<u8>,
    }

    /// Answers every request with a fixed status and remembers it.
    struct RecordingTransport {
        status: u16,
        fail: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingTransport {
        fn answering(status: u16) -> Arc<Self> {
            Arc::new(Self {
                status,
                fail: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                status: 0,
                fail: true,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_sender_key(&self) -> [u8; 65] {
            let calls = self.calls.lock().unwrap();
            let body = &calls.last().unwrap().body;
            *wire::decode_header(body).unwrap().sender_public_key
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn deliver(
            &self,
            endpoint: &str,
            headers: &DeliveryHeaders,
            body: Vec<u8>,
        ) -> Result<u16, TransportError> {
            self.calls.lock().unwrap().push(Call {
                endpoint: endpoint.to_string(),
                headers: headers.clone(),
                body,
            });
            if self.fail {
                return Err(TransportError::new("connection reset"));
            }
            Ok(self.status)
        }
    }

    fn config() -> PushConfig {
        PushConfig::new(VAPID_PUBLIC, VAPID_PRIVATE, SUBJECT)
    }

    fn subscription() -> Subscription {
        Subscription::new(ENDPOINT, P256DH, AUTH)
    }

    fn message() -> PushMessage {
        PushMessage::new(b"hello".to_vec(), Duration::from_secs(60))
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_bad_subject_fails_construction() {
        let config = PushConfig::new(VAPID_PUBLIC, VAPID_PRIVATE, "ops@example.com");
        let err = Dispatcher::new(&config, RecordingTransport::answering(201)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Vapid(webpush_envelope::VapidError::InvalidSubject)
        ));
    }

    #[tokio::test]
    async fn test_bad_vapid_keys_fail_construction() {
        let config = PushConfig::new(VAPID_PRIVATE, VAPID_PUBLIC, SUBJECT);
        assert!(matches!(
            Dispatcher::new(&config, RecordingTransport::answering(201)),
            Err(ConfigError::Vapid(_))
        ));

        let config = PushConfig::new("", VAPID_PRIVATE, SUBJECT);
        assert!(matches!(
            Dispatcher::new(&config, RecordingTransport::answering(201)),
            Err(ConfigError::Missing(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Send
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_send_success() {
        let transport = RecordingTransport::answering(201);
        let dispatcher = Dispatcher::new(&config(), transport.clone()).unwrap();

        let message = message().with_urgency(Urgency::High);
        let delivery = dispatcher.send(&subscription(), &message).await.unwrap();
        assert_eq!(delivery.status, 201);
        assert_eq!(delivery.record_len, 86 + 5 + 1 + 16);

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.endpoint, ENDPOINT);
        assert_eq!(call.body.len(), delivery.record_len);
        assert_eq!(call.headers.urgency, Some(Urgency::High));
        assert_eq!(call.headers.ttl_secs(), 60);
        assert!(call.headers.authorization.starts_with("vapid t="));
        assert!(call
            .headers
            .authorization
            .ends_with(&format!(", k={}", VAPID_PUBLIC)));

        let header = wire::decode_header(&call.body).unwrap();
        assert_eq!(
            header.sender_public_key,
            &dispatcher.key_material().current_public_key()
        );
    }

    #[tokio::test]
    async fn test_urgency_omitted_when_unset() {
        let transport = RecordingTransport::answering(201);
        let dispatcher = Dispatcher::new(&config(), transport.clone()).unwrap();

        dispatcher.send(&subscription(), &message()).await.unwrap();
        assert_eq!(transport.calls.lock().unwrap()[0].headers.urgency, None);
    }

    #[tokio::test]
    async fn test_gone_maps_to_delete() {
        let dispatcher = Dispatcher::new(&config(), RecordingTransport::answering(410)).unwrap();

        let err = dispatcher.send(&subscription(), &message()).await.unwrap_err();
        assert_eq!(err.push_service(), Some(PushServiceError::Gone));
        assert!(err.should_delete_subscription());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let dispatcher = Dispatcher::new(&config(), RecordingTransport::answering(429)).unwrap();

        let err = dispatcher.send(&subscription(), &message()).await.unwrap_err();
        assert_eq!(err.push_service(), Some(PushServiceError::TooManyRequests));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unexpected_status() {
        let dispatcher = Dispatcher::new(&config(), RecordingTransport::answering(418)).unwrap();

        let err = dispatcher.send(&subscription(), &message()).await.unwrap_err();
        assert_eq!(
            err.push_service(),
            Some(PushServiceError::UnexpectedResponse(418))
        );
    }

    #[tokio::test]
    async fn test_status_check_disabled_returns_status() {
        let config = config().with_status_check(false);
        let dispatcher = Dispatcher::new(&config, RecordingTransport::answering(410)).unwrap();
        assert!(matches!(dispatcher.status_policy(), StatusPolicy::Disabled));

        let delivery = dispatcher.send(&subscription(), &message()).await.unwrap();
        assert_eq!(delivery.status, 410);
    }

    #[tokio::test]
    async fn test_custom_status_policy() {
        fn accept_gone(status: u16) -> Result<(), PushServiceError> {
            match status {
                410 => Ok(()),
                other => validate_status_code(other),
            }
        }

        let dispatcher = Dispatcher::new(&config(), RecordingTransport::answering(410))
            .unwrap()
            .with_status_policy(StatusPolicy::Custom(accept_gone));
        assert_eq!(
            dispatcher.send(&subscription(), &message()).await.unwrap().status,
            410
        );
    }

    #[tokio::test]
    async fn test_input_errors_never_reach_transport() {
        let transport = RecordingTransport::answering(201);
        let dispatcher = Dispatcher::new(&config(), transport.clone()).unwrap();

        let bad_key = Subscription::new(ENDPOINT, AUTH, AUTH);
        let err = dispatcher.send(&bad_key, &message()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Encrypt(ref e) if e.is_input_error()));

        let too_long = PushMessage::new(vec![0u8; 3994], Duration::from_secs(60));
        let err = dispatcher.send(&subscription(), &too_long).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Encrypt(webpush_envelope::EncryptError::PlaintextTooLong { .. })
        ));

        let bad_endpoint = Subscription::new("not a url", P256DH, AUTH);
        let err = dispatcher.send(&bad_endpoint, &message()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Vapid(_)));

        assert_eq!(transport.count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_carries_endpoint() {
        let transport = RecordingTransport::failing();
        let dispatcher = Dispatcher::new(&config(), transport.clone()).unwrap();

        let err = dispatcher.send(&subscription(), &message()).await.unwrap_err();
        match err {
            DispatchError::Transport { endpoint, source } => {
                assert_eq!(endpoint, ENDPOINT);
                assert_eq!(source.to_string(), "connection reset");
            }
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(transport.count(), 1);
    }

    #[tokio::test]
    async fn test_every_send_is_fresh() {
        let transport = RecordingTransport::answering(201);
        let dispatcher = Dispatcher::new(&config(), transport.clone()).unwrap();

        let (sub, msg) = (subscription(), message());
        let (a, b) = tokio::join!(dispatcher.send(&sub, &msg), dispatcher.send(&sub, &msg));
        a.unwrap();
        b.unwrap();

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0].body, calls[1].body);
        assert_ne!(calls[0].body[..16], calls[1].body[..16]);
    }

    // -----------------------------------------------------------------------
    // Rotation
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_rotation_changes_sender_key() {
        let transport = RecordingTransport::answering(201);
        let sink = Arc::new(InMemoryErrorSink::new());
        let config = config().with_key_rotation(Duration::from_secs(3600));
        let mut dispatcher =
            Dispatcher::with_error_sink(&config, transport.clone(), sink.clone()).unwrap();

        dispatcher.send(&subscription(), &message()).await.unwrap();
        let before = transport.last_sender_key();

        tokio::time::sleep(Duration::from_secs(3601)).await;
        assert_eq!(dispatcher.key_material().generation(), 1);

        dispatcher.send(&subscription(), &message()).await.unwrap();
        let after = transport.last_sender_key();
        assert_ne!(before, after);

        dispatcher.shutdown().await;
        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert_eq!(dispatcher.key_material().generation(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_rotation_outside_runtime_is_config_error() {
        let config = config().with_key_rotation(Duration::from_secs(60));
        let err = Dispatcher::new(&config, RecordingTransport::answering(201)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Rotation(RotationSpawnError::NoRuntime)
        ));

        // Without rotation no runtime is needed.
        assert!(Dispatcher::new(&self::config(), RecordingTransport::answering(201)).is_ok());
    }

    #[tokio::test]
    async fn test_no_rotation_by_default() {
        let mut dispatcher =
            Dispatcher::new(&config(), RecordingTransport::answering(201)).unwrap();
        assert!(!format!("{:?}", dispatcher).contains("rotating: true"));
        dispatcher.shutdown().await;
        assert_eq!(dispatcher.key_material().generation(), 0);
    }
}
