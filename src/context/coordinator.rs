use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::collector::TelemetryCollector;
use crate::models::{InteractionType, Metadata, TelemetryPayload};

use super::commands::{Command, DeliveryRequest, Tracked};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Owns the collector; applies commands in order and emits a payload to the
/// delivery task every `report_interval`.
pub(crate) async fn coordinator_loop(
    mut collector: TelemetryCollector,
    mut commands: UnboundedReceiver<Command>,
    delivery: UnboundedSender<DeliveryRequest>,
    report_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + report_interval, report_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut user_id: Option<String> = None;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    log_debug!("all telemetry handles dropped; coordinator exiting");
                    break;
                };
                apply(&mut collector, &mut user_id, &delivery, command).await;
            }
            _ = ticker.tick() => {
                forward(&delivery, DeliveryRequest::Send(Box::new(build(&collector, user_id.as_deref()))));
            }
            _ = cancel_token.cancelled() => {
                log_info!("telemetry coordinator shutting down");
                break;
            }
        }
    }
}

async fn apply(
    collector: &mut TelemetryCollector,
    user_id: &mut Option<String>,
    delivery: &UnboundedSender<DeliveryRequest>,
    command: Command,
) {
    match command {
        Command::Track(tracked, at) => track(collector, tracked, at),
        Command::Record {
            kind,
            target,
            metadata,
            at,
        } => collector.record(kind, &target, metadata, at),
        Command::Navigate {
            from,
            to,
            at,
            requested_at,
        } => {
            let mut metadata = Metadata::new();
            if let Some(from) = from {
                metadata.insert("from".into(), from.into());
            }
            collector.record(InteractionType::Navigation, &to, metadata, at);
            collector
                .sampler_mut()
                .sample_on_mount("navigation", requested_at)
                .await;
        }
        Command::Mount {
            component,
            requested_at,
        } => {
            collector
                .sampler_mut()
                .sample_on_mount(&component, requested_at)
                .await;
        }
        Command::Error(error) => collector.track_error(error),
        Command::Action(timing) => collector.sampler_mut().record_action(timing),
        Command::SetUser(id) => *user_id = id,
        Command::Connectivity(online) => forward(delivery, DeliveryRequest::Connectivity(online)),
        Command::Report => {
            forward(delivery, DeliveryRequest::Send(Box::new(build(collector, user_id.as_deref()))))
        }
        Command::Flush(reply) => forward(delivery, DeliveryRequest::Flush(reply)),
        Command::QueueLength(reply) => forward(delivery, DeliveryRequest::QueueLength(reply)),
        Command::Stats(reply) => {
            let _ = reply.send(collector.stats(Utc::now()));
        }
        Command::Payload { user_id, reply } => {
            let session_id = collector.session().id().to_string();
            let _ = reply.send(collector.build_payload(&session_id, user_id.as_deref(), Utc::now()));
        }
        Command::Unload(done) => {
            let payload = Box::new(build(collector, user_id.as_deref()));
            forward(delivery, DeliveryRequest::Unload { payload, done });
        }
    }
}

fn track(collector: &mut TelemetryCollector, tracked: Tracked, at: DateTime<Utc>) {
    match tracked {
        Tracked::Click { target } => collector.track_click(&target, at),
        Tracked::Search {
            query,
            result_count,
        } => collector.track_search(&query, result_count, at),
        Tracked::CartAdd {
            service_id,
            quantity,
        } => collector.track_cart_add(&service_id, quantity, at),
        Tracked::CartRemove {
            service_id,
            quantity,
        } => collector.track_cart_remove(&service_id, quantity, at),
        Tracked::ServiceView { service_id } => collector.track_service_view(&service_id, at),
        Tracked::FilterApply { filter, value } => collector.track_filter_apply(&filter, value, at),
        Tracked::FormSubmit { form, succeeded } => {
            collector.track_form_submit(&form, succeeded, at)
        }
    }
}

fn build(collector: &TelemetryCollector, user_id: Option<&str>) -> TelemetryPayload {
    let session_id = collector.session().id().to_string();
    collector.build_payload(&session_id, user_id, Utc::now())
}

fn forward(delivery: &UnboundedSender<DeliveryRequest>, request: DeliveryRequest) {
    if delivery.send(request).is_err() {
        log_debug!("delivery task gone; dropping request");
    }
}
