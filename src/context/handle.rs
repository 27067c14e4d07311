use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc::UnboundedSender, oneshot};
use tokio::time::Instant;

use crate::models::{
    ErrorRecord, InteractionType, Metadata, MetadataValue, TelemetryPayload, TelemetryStats,
};
use crate::performance;
use crate::transport::FlushOutcome;

use super::commands::{Command, Tracked};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Cheap, cloneable entry point into a running [`super::TelemetryContext`].
///
/// Every method is safe to call and forget: nothing here returns an error
/// or blocks on the network. Once the context is disposed, calls are
/// silently ignored and queries return `None`.
#[derive(Clone)]
pub struct TelemetryHandle {
    commands: UnboundedSender<Command>,
    session_id: Arc<str>,
}

impl TelemetryHandle {
    pub(crate) fn new(commands: UnboundedSender<Command>, session_id: Arc<str>) -> Self {
        Self {
            commands,
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record(&self, kind: InteractionType, target: impl Into<String>, metadata: Metadata) {
        self.dispatch(Command::Record {
            kind,
            target: target.into(),
            metadata,
            at: Utc::now(),
        });
    }

    pub fn track_click(&self, target: impl Into<String>) {
        self.track(Tracked::Click {
            target: target.into(),
        });
    }

    pub fn track_search(&self, query: impl Into<String>, result_count: Option<u32>) {
        self.track(Tracked::Search {
            query: query.into(),
            result_count,
        });
    }

    pub fn track_cart_add(&self, service_id: impl Into<String>, quantity: u32) {
        self.track(Tracked::CartAdd {
            service_id: service_id.into(),
            quantity,
        });
    }

    pub fn track_cart_remove(&self, service_id: impl Into<String>, quantity: u32) {
        self.track(Tracked::CartRemove {
            service_id: service_id.into(),
            quantity,
        });
    }

    pub fn track_service_view(&self, service_id: impl Into<String>) {
        self.track(Tracked::ServiceView {
            service_id: service_id.into(),
        });
    }

    pub fn track_filter_apply(&self, filter: impl Into<String>, value: impl Into<MetadataValue>) {
        self.track(Tracked::FilterApply {
            filter: filter.into(),
            value: value.into(),
        });
    }

    pub fn track_form_submit(&self, form: impl Into<String>, succeeded: bool) {
        self.track(Tracked::FormSubmit {
            form: form.into(),
            succeeded,
        });
    }

    pub fn track_error(
        &self,
        kind: impl Into<String>,
        message: impl Into<String>,
        stack_trace: Option<String>,
        component_context: Option<String>,
    ) {
        self.dispatch(Command::Error(ErrorRecord {
            kind: kind.into(),
            message: message.into(),
            occurred_at: Utc::now(),
            stack_trace,
            component_context,
        }));
    }

    /// Records a page transition and re-samples performance for the new page.
    pub fn navigate(&self, from: Option<String>, to: impl Into<String>) {
        self.dispatch(Command::Navigate {
            from,
            to: to.into(),
            at: Utc::now(),
            requested_at: Instant::now(),
        });
    }

    /// Re-samples navigation and paint timing once the host has painted.
    pub fn sample_on_mount(&self, component: impl Into<String>) {
        self.dispatch(Command::Mount {
            component: component.into(),
            requested_at: Instant::now(),
        });
    }

    /// Times `action` and reports its duration and outcome; the action's own
    /// result is passed through untouched.
    pub async fn measure_action<F, T, E>(&self, name: &str, action: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let (result, timing) = performance::measure_action(name, action).await;
        self.dispatch(Command::Action(timing));
        result
    }

    pub fn measure_sync<F, T, E>(&self, name: &str, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let (result, timing) = performance::measure_sync(name, action);
        self.dispatch(Command::Action(timing));
        result
    }

    pub fn set_user(&self, user_id: Option<String>) {
        self.dispatch(Command::SetUser(user_id));
    }

    pub fn set_online(&self, online: bool) {
        self.dispatch(Command::Connectivity(online));
    }

    /// Builds a payload from the current state and sends it without waiting
    /// for the next reporting tick.
    pub fn report_now(&self) {
        self.dispatch(Command::Report);
    }

    pub async fn flush_now(&self) -> Option<FlushOutcome> {
        self.query(Command::Flush).await
    }

    pub async fn queued_payloads(&self) -> Option<usize> {
        self.query(Command::QueueLength).await
    }

    pub async fn get_stats(&self) -> Option<TelemetryStats> {
        self.query(Command::Stats).await
    }

    pub async fn build_payload(&self, user_id: Option<String>) -> Option<TelemetryPayload> {
        self.query(|reply| Command::Payload { user_id, reply }).await
    }

    pub(crate) async fn unload(&self) {
        self.query(Command::Unload).await;
    }

    fn track(&self, tracked: Tracked) {
        self.dispatch(Command::Track(tracked, Utc::now()));
    }

    async fn query<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply, response) = oneshot::channel();
        self.dispatch(command(reply));
        response.await.ok()
    }

    fn dispatch(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log_debug!("telemetry context disposed; ignoring call");
        }
    }
}
