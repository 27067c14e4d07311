use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::models::{
    ErrorRecord, InteractionType, Metadata, MetadataValue, TelemetryPayload, TelemetryStats,
};
use crate::performance::ActionTiming;
use crate::transport::FlushOutcome;

/// Typed form of the `track*` entry points.
#[derive(Debug, Clone)]
pub(crate) enum Tracked {
    Click {
        target: String,
    },
    Search {
        query: String,
        result_count: Option<u32>,
    },
    CartAdd {
        service_id: String,
        quantity: u32,
    },
    CartRemove {
        service_id: String,
        quantity: u32,
    },
    ServiceView {
        service_id: String,
    },
    FilterApply {
        filter: String,
        value: MetadataValue,
    },
    FormSubmit {
        form: String,
        succeeded: bool,
    },
}

/// Work items for the coordinator task, applied strictly in send order.
pub(crate) enum Command {
    Track(Tracked, DateTime<Utc>),
    Record {
        kind: InteractionType,
        target: String,
        metadata: Metadata,
        at: DateTime<Utc>,
    },
    Navigate {
        from: Option<String>,
        to: String,
        at: DateTime<Utc>,
        requested_at: Instant,
    },
    Mount {
        component: String,
        requested_at: Instant,
    },
    Error(ErrorRecord),
    Action(ActionTiming),
    SetUser(Option<String>),
    Connectivity(bool),
    Report,
    Flush(oneshot::Sender<FlushOutcome>),
    QueueLength(oneshot::Sender<usize>),
    Stats(oneshot::Sender<TelemetryStats>),
    Payload {
        user_id: Option<String>,
        reply: oneshot::Sender<TelemetryPayload>,
    },
    Unload(oneshot::Sender<()>),
}

/// Work items for the delivery task.
pub(crate) enum DeliveryRequest {
    Send(Box<TelemetryPayload>),
    Connectivity(bool),
    Flush(oneshot::Sender<FlushOutcome>),
    QueueLength(oneshot::Sender<usize>),
    Unload {
        payload: Box<TelemetryPayload>,
        done: oneshot::Sender<()>,
    },
}
