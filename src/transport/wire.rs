//! JSON bodies accepted by the collector endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TelemetryPayload;

pub const COLLECTOR_ID: &str = "metrics_render";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvelopeBody {
    SingleMetric(Box<TelemetryPayload>),
    BatchMetric { batch: Vec<TelemetryPayload> },
}

/// `{ id, type, timestamp, ... }` where the rest is either one payload's
/// fields inlined or a `batch` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(flatten)]
    pub body: EnvelopeBody,
}

impl Envelope {
    pub fn single(payload: TelemetryPayload, now: DateTime<Utc>) -> Self {
        Self {
            id: COLLECTOR_ID.to_string(),
            timestamp: now.timestamp_millis(),
            body: EnvelopeBody::SingleMetric(Box::new(payload)),
        }
    }

    pub fn batch(batch: Vec<TelemetryPayload>, now: DateTime<Utc>) -> Self {
        Self {
            id: COLLECTOR_ID.to_string(),
            timestamp: now.timestamp_millis(),
            body: EnvelopeBody::BatchMetric { batch },
        }
    }

    pub fn payloads(&self) -> Vec<&TelemetryPayload> {
        match &self.body {
            EnvelopeBody::SingleMetric(payload) => vec![payload.as_ref()],
            EnvelopeBody::BatchMetric { batch } => batch.iter().collect(),
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self.body, EnvelopeBody::BatchMetric { .. })
    }
}
