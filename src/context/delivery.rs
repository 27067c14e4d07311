use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::transport::TransportService;

use super::commands::DeliveryRequest;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Sole owner of the transport. Periodic flushing is the recovery path
/// after an outage; reconnecting also flushes right away.
pub(crate) async fn delivery_loop(
    mut transport: TransportService,
    mut requests: UnboundedReceiver<DeliveryRequest>,
    flush_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + flush_interval, flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else {
                    break;
                };
                handle(&mut transport, request).await;
            }
            _ = ticker.tick() => {
                let outcome = transport.flush(false).await;
                log_debug!("periodic flush: {outcome:?}");
            }
            _ = cancel_token.cancelled() => {
                log_info!(
                    "telemetry delivery shutting down with {} payloads undelivered",
                    transport.queue().len()
                );
                break;
            }
        }
    }
}

async fn handle(transport: &mut TransportService, request: DeliveryRequest) {
    match request {
        DeliveryRequest::Send(payload) => {
            transport.send(*payload).await;
        }
        DeliveryRequest::Connectivity(online) => {
            transport.set_online(online).await;
        }
        DeliveryRequest::Flush(reply) => {
            let _ = reply.send(transport.flush(false).await);
        }
        DeliveryRequest::QueueLength(reply) => {
            let _ = reply.send(transport.queue().len());
        }
        DeliveryRequest::Unload { payload, done } => {
            transport.enqueue(*payload);
            let handled = transport.flush_all(true).await;
            log_debug!("unload flush handed off {handled} payloads");
            let _ = done.send(());
        }
    }
}
