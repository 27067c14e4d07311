//! Lifecycle of one telemetry pipeline instance.
//!
//! A context owns two tasks. The coordinator holds the collector (interaction
//! aggregator, performance sampler, session) and applies every tracking call
//! in arrival order. The delivery task holds the transport and its queue.
//! Collaborators reach both through a [`TelemetryHandle`] or by publishing on
//! the context's event buses.

mod commands;
mod coordinator;
mod delivery;
mod handle;

pub use handle::TelemetryHandle;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::collector::TelemetryCollector;
use crate::events::{
    subscribe_connectivity, subscribe_navigation, subscribe_ui_events, ConnectivityEvent, EventBus,
    NavigationEvent, Subscription, UiEvent,
};
use crate::performance::HostEnvironment;
use crate::settings::TelemetrySettings;
use crate::transport::{Collector, TransportService};
use crate::usability::SessionState;

use coordinator::coordinator_loop;
use delivery::delivery_loop;

const ENABLE_LOGS: bool = true;

use crate::log_info;

pub struct TelemetryContext {
    handle: TelemetryHandle,
    navigation: EventBus<NavigationEvent>,
    connectivity: EventBus<ConnectivityEvent>,
    ui_events: EventBus<UiEvent>,
    subscriptions: Vec<Subscription>,
    cancel_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl TelemetryContext {
    /// Starts the pipeline. Must be called from within a tokio runtime.
    pub fn create(
        settings: TelemetrySettings,
        host: Arc<dyn HostEnvironment>,
        collector: Arc<dyn Collector>,
    ) -> Self {
        let now = Utc::now();
        let session = SessionState::create(now);
        let session_id: Arc<str> = Arc::from(session.id());

        let mut telemetry =
            TelemetryCollector::new(Arc::clone(&host), session, settings.top_interactions_limit);
        telemetry.enter_page(&host.page_url(), now);

        let transport = TransportService::new(&settings, collector);
        let cancel_token = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();

        let tasks = vec![
            tokio::spawn(coordinator_loop(
                telemetry,
                command_rx,
                delivery_tx,
                settings.report_interval(),
                cancel_token.clone(),
            )),
            tokio::spawn(delivery_loop(
                transport,
                delivery_rx,
                settings.flush_interval(),
                cancel_token.clone(),
            )),
        ];

        let handle = TelemetryHandle::new(command_tx, Arc::clone(&session_id));
        let navigation = EventBus::default();
        let connectivity = EventBus::default();
        let ui_events = EventBus::default();

        let subscriptions = vec![
            subscribe_navigation(&navigation, {
                let handle = handle.clone();
                move |event: NavigationEvent| handle.navigate(event.from, event.to)
            }),
            subscribe_connectivity(&connectivity, {
                let handle = handle.clone();
                move |online| handle.set_online(online)
            }),
            subscribe_ui_events(&ui_events, settings.scroll_debounce(), {
                let handle = handle.clone();
                move |kind, target, metadata| handle.record(kind, target, metadata)
            }),
        ];

        log_info!(
            "telemetry started for {session_id} (enabled: {}, endpoint: {})",
            settings.enabled,
            settings.endpoint
        );

        Self {
            handle,
            navigation,
            connectivity,
            ui_events,
            subscriptions,
            cancel_token,
            tasks,
        }
    }

    pub fn handle(&self) -> TelemetryHandle {
        self.handle.clone()
    }

    /// Bus the routing layer publishes page transitions on.
    pub fn navigation_bus(&self) -> &EventBus<NavigationEvent> {
        &self.navigation
    }

    /// Bus the host publishes online/offline transitions on.
    pub fn connectivity_bus(&self) -> &EventBus<ConnectivityEvent> {
        &self.connectivity
    }

    /// Bus for raw click, scroll and input events.
    pub fn ui_event_bus(&self) -> &EventBus<UiEvent> {
        &self.ui_events
    }

    /// Stops listening, makes a last best-effort delivery of everything
    /// queued (beacon-style when the collector supports it), then tears
    /// down both tasks.
    pub async fn dispose(mut self) -> Result<()> {
        for subscription in self.subscriptions.drain(..) {
            subscription.dispose().await?;
        }

        self.handle.unload().await;
        self.cancel_token.cancel();

        for task in self.tasks.drain(..) {
            task.await.context("telemetry task failed to join")?;
        }

        log_info!("telemetry for {} disposed", self.handle.session_id());
        Ok(())
    }
}

impl Drop for TelemetryContext {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
