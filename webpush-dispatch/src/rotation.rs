//! Periodic rotation of the encryption key pair.
//!
//! Rotation runs off the send path: failures go to a [`RotationErrorSink`],
//! never to a caller of `send`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use webpush_envelope::{KeyGenerationError, KeyMaterial};

use crate::error::RotationSpawnError;

// ---------------------------------------------------------------------------
// Error sink
// ---------------------------------------------------------------------------

/// Where rotation failures go.
pub trait RotationErrorSink: Send + Sync {
    fn report(&self, error: KeyGenerationError);
}

/// Logs failures via the `tracing` crate.
pub struct TracingErrorSink;

impl RotationErrorSink for TracingErrorSink {
    fn report(&self, error: KeyGenerationError) {
        tracing::error!(error = %error, "error while rotating keys");
    }
}

/// Collects failures in memory (for tests).
#[derive(Default)]
pub struct InMemoryErrorSink {
    errors: Mutex<Vec<KeyGenerationError>>,
}

impl InMemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<KeyGenerationError> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RotationErrorSink for InMemoryErrorSink {
    fn report(&self, error: KeyGenerationError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }
}

// ---------------------------------------------------------------------------
// Rotation task
// ---------------------------------------------------------------------------

/// Background task rotating a [`KeyMaterial`] every `interval`.
///
/// Stop it with [`shutdown`](Self::shutdown). Dropping the handle also
/// stops the task at its next wakeup.
pub struct RotationTask {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RotationTask {
    /// Spawn on the current tokio runtime. The first rotation happens one
    /// full `interval` after the call.
    ///
    /// Fails outside a runtime and for a zero `interval`.
    pub fn spawn(
        keys: Arc<KeyMaterial>,
        interval: Duration,
        sink: Arc<dyn RotationErrorSink>,
    ) -> Result<Self, RotationSpawnError> {
        if interval.is_zero() {
            return Err(RotationSpawnError::ZeroInterval);
        }
        let runtime = Handle::try_current().map_err(|_| RotationSpawnError::NoRuntime)?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = runtime.spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match keys.rotate() {
                            Ok(generation) => {
                                tracing::debug!(generation, "rotated encryption key pair")
                            }
                            Err(e) => sink.report(e),
                        }
                    }
                    // Fires on explicit shutdown and when the sender is dropped.
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for RotationTask {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
