//! Delivery of telemetry payloads to the remote collector.
//!
//! `TransportService` is driven by a single task (see `context::delivery`),
//! so queue mutations are never interleaved with one another. Network calls
//! are the only suspension points, and the queue is never left half-spliced
//! across them: a batch is taken out whole and put back whole.

mod client;
mod queue;
mod wire;

pub use client::{Collector, HttpCollector, RecordingCollector};
pub use queue::{DeliveryQueue, QueuedPayload};
pub use wire::{Envelope, EnvelopeBody, COLLECTOR_ID};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::TransportError;
use crate::models::TelemetryPayload;
use crate::settings::TelemetrySettings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Queued,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Disabled, offline, or nothing queued.
    Skipped,
    Delivered(usize),
    /// Handed to the beacon primitive; the result is unknowable.
    Beaconed(usize),
    /// Delivery failed; `requeued` went back to the front, `evicted` hit the
    /// attempt cap.
    Failed { requeued: usize, evicted: usize },
}

pub struct TransportService {
    collector: Arc<dyn Collector>,
    queue: DeliveryQueue,
    enabled: bool,
    online: bool,
    batch_size: usize,
    send_timeout: Duration,
    flush_timeout: Duration,
    max_delivery_attempts: u32,
}

impl TransportService {
    pub fn new(settings: &TelemetrySettings, collector: Arc<dyn Collector>) -> Self {
        Self {
            collector,
            queue: DeliveryQueue::new(settings.queue_capacity, settings.queue_retain),
            enabled: settings.enabled,
            online: true,
            batch_size: settings.batch_size.max(1),
            send_timeout: settings.send_timeout(),
            flush_timeout: settings.flush_timeout(),
            max_delivery_attempts: settings.max_delivery_attempts,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    /// Delivers `payload` now if online, otherwise queues it. Failures are
    /// absorbed by queuing.
    pub async fn send(&mut self, payload: TelemetryPayload) -> SendOutcome {
        if !self.enabled {
            log_debug!("telemetry disabled; dropping payload");
            return SendOutcome::Dropped;
        }

        if !self.online {
            self.enqueue(payload);
            return SendOutcome::Queued;
        }

        let envelope = Envelope::single(payload, Utc::now());
        let timeout = self.send_timeout;
        match with_timeout(timeout, self.collector.post(&envelope, timeout)).await {
            Ok(()) => SendOutcome::Delivered,
            Err(err) => {
                log_warn!(
                    "telemetry send failed ({}), queuing for retry: {err}",
                    if err.is_network() { "network" } else { "collector" }
                );
                if let EnvelopeBody::SingleMetric(payload) = envelope.body {
                    self.enqueue(*payload);
                }
                SendOutcome::Queued
            }
        }
    }

    pub fn enqueue(&mut self, payload: TelemetryPayload) {
        if !self.enabled {
            log_debug!("telemetry disabled; not queuing payload");
            return;
        }

        let dropped = self.queue.push(payload);
        if dropped > 0 {
            log_warn!(
                "telemetry queue over capacity, discarded {dropped} oldest payloads ({} kept)",
                self.queue.len()
            );
        }
    }

    /// Attempts one batch from the head of the queue.
    pub async fn flush(&mut self, is_page_unloading: bool) -> FlushOutcome {
        if !self.enabled || !self.online || self.queue.is_empty() {
            return FlushOutcome::Skipped;
        }

        let mut batch = self.queue.take_batch(self.batch_size);
        let count = batch.len();
        let envelope = Envelope::batch(
            batch.iter().map(|entry| entry.payload.clone()).collect(),
            Utc::now(),
        );

        if is_page_unloading && self.collector.supports_beacon() {
            self.collector.beacon(envelope);
            log_debug!("beaconed {count} queued payloads on unload");
            return FlushOutcome::Beaconed(count);
        }

        let timeout = self.flush_timeout;
        match with_timeout(timeout, self.collector.post(&envelope, timeout)).await {
            Ok(()) => {
                log_debug!("flushed {count} queued payloads, {} remain", self.queue.len());
                FlushOutcome::Delivered(count)
            }
            Err(err) => {
                for entry in batch.iter_mut() {
                    entry.attempts += 1;
                }
                let cap = self.max_delivery_attempts;
                let (kept, evicted): (Vec<_>, Vec<_>) = batch
                    .into_iter()
                    .partition(|entry| cap == 0 || entry.attempts < cap);

                if !evicted.is_empty() {
                    log_warn!(
                        "evicting {} payloads after {cap} failed deliveries",
                        evicted.len()
                    );
                }
                log_warn!("telemetry flush failed, requeuing {}: {err}", kept.len());

                let requeued = kept.len();
                self.queue.requeue_front(kept);
                FlushOutcome::Failed {
                    requeued,
                    evicted: evicted.len(),
                }
            }
        }
    }

    /// Drains the queue batch by batch until it is empty or a flush fails.
    pub async fn flush_all(&mut self, is_page_unloading: bool) -> usize {
        let mut handled = 0;
        loop {
            match self.flush(is_page_unloading).await {
                FlushOutcome::Delivered(count) | FlushOutcome::Beaconed(count) => handled += count,
                FlushOutcome::Skipped | FlushOutcome::Failed { .. } => return handled,
            }
        }
    }

    /// Applies a connectivity change. Coming back online flushes immediately.
    pub async fn set_online(&mut self, online: bool) -> FlushOutcome {
        if online == self.online {
            return FlushOutcome::Skipped;
        }
        self.online = online;

        if online {
            log_info!("connectivity restored, {} payloads queued", self.queue.len());
            self.flush(false).await
        } else {
            log_info!("connectivity lost; queuing telemetry");
            FlushOutcome::Skipped
        }
    }
}

async fn with_timeout<F>(limit: Duration, delivery: F) -> Result<(), TransportError>
where
    F: Future<Output = Result<(), TransportError>>,
{
    match tokio::time::timeout(limit, delivery).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}
