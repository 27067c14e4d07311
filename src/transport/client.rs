use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::TransportError;

use super::wire::Envelope;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Remote end that accepts telemetry envelopes.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Delivers one envelope. Only HTTP 200 counts as success.
    async fn post(&self, envelope: &Envelope, timeout: Duration) -> Result<(), TransportError>;

    /// Whether [`Collector::beacon`] can be used right now.
    fn supports_beacon(&self) -> bool {
        false
    }

    /// Hands `envelope` off without waiting for, or learning about, the result.
    fn beacon(&self, _envelope: Envelope) {}
}

/// JSON-over-HTTP collector.
#[derive(Clone)]
pub struct HttpCollector {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCollector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("storefront-telemetry/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn post(&self, envelope: &Envelope, timeout: Duration) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(envelope)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout(timeout)
                } else {
                    TransportError::from(err)
                }
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(TransportError::Status(status.as_u16())),
        }
    }

    fn supports_beacon(&self) -> bool {
        tokio::runtime::Handle::try_current().is_ok()
    }

    fn beacon(&self, envelope: Envelope) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let request = self.client.post(&self.endpoint).json(&envelope);
        runtime.spawn(async move {
            if let Err(err) = request.send().await {
                log_debug!("beacon delivery lost: {err}");
            }
        });
    }
}

/// Collector that keeps envelopes in memory. Useful for hosts without a
/// network and for exercising the pipeline.
#[derive(Clone, Default)]
pub struct RecordingCollector {
    inner: Arc<RecordingState>,
}

#[derive(Default)]
struct RecordingState {
    delivered: Mutex<Vec<Envelope>>,
    attempts: Mutex<Vec<Envelope>>,
    beacons: Mutex<Vec<Envelope>>,
    failing: AtomicBool,
    beacon_available: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl RecordingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// While failing, every post is rejected as a connection error.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_beacon_available(&self, available: bool) {
        self.inner.beacon_available.store(available, Ordering::SeqCst);
    }

    /// Envelopes that were accepted.
    pub fn delivered(&self) -> Vec<Envelope> {
        lock(&self.inner.delivered).clone()
    }

    /// Every post, accepted or not, in call order.
    pub fn attempts(&self) -> Vec<Envelope> {
        lock(&self.inner.attempts).clone()
    }

    pub fn beacons(&self) -> Vec<Envelope> {
        lock(&self.inner.beacons).clone()
    }
}

#[async_trait]
impl Collector for RecordingCollector {
    async fn post(&self, envelope: &Envelope, _timeout: Duration) -> Result<(), TransportError> {
        lock(&self.inner.attempts).push(envelope.clone());
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("collector offline".into()));
        }
        lock(&self.inner.delivered).push(envelope.clone());
        Ok(())
    }

    fn supports_beacon(&self) -> bool {
        self.inner.beacon_available.load(Ordering::SeqCst)
    }

    fn beacon(&self, envelope: Envelope) {
        lock(&self.inner.beacons).push(envelope);
    }
}
