//! JSON-lines protocol between a host shell (webview, test harness) and the
//! telemetry pipeline. One message per line, tagged by `event`.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::TelemetryContext;
use crate::events::{ConnectivityEvent, ElementDescriptor, NavigationEvent, UiEvent, UiEventKind};
use crate::models::MetadataValue;

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostMessage {
    Ui(UiEvent),
    #[serde(rename_all = "camelCase")]
    Click { target: String },
    /// Routed through the UI bus so bursts are debounced.
    Scroll {
        #[serde(default)]
        element: ElementDescriptor,
    },
    Input {
        #[serde(default)]
        element: ElementDescriptor,
    },
    #[serde(rename_all = "camelCase")]
    Search {
        query: String,
        #[serde(default)]
        result_count: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    CartAdd {
        service_id: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    #[serde(rename_all = "camelCase")]
    CartRemove {
        service_id: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    #[serde(rename_all = "camelCase")]
    ServiceView { service_id: String },
    FilterApply { filter: String, value: MetadataValue },
    FormSubmit {
        form: String,
        #[serde(default)]
        success: bool,
    },
    Navigate(NavigationEvent),
    Online,
    Offline,
    Mount { component: String },
    #[serde(rename_all = "camelCase")]
    Error {
        kind: String,
        message: String,
        #[serde(default)]
        stack_trace: Option<String>,
        #[serde(default)]
        component: Option<String>,
    },
    User {
        #[serde(default)]
        id: Option<String>,
    },
    Report,
    Flush,
    Stats,
}

impl HostMessage {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// Applies one message. Queries answer with a JSON value to print back.
pub async fn dispatch(context: &TelemetryContext, message: HostMessage) -> Option<Value> {
    let handle = context.handle();
    match message {
        HostMessage::Ui(event) => context.ui_event_bus().publish(event),
        HostMessage::Click { target } => handle.track_click(target),
        HostMessage::Scroll { element } => context.ui_event_bus().publish(UiEvent {
            kind: UiEventKind::Scroll,
            element,
        }),
        HostMessage::Input { element } => context.ui_event_bus().publish(UiEvent {
            kind: UiEventKind::Input,
            element,
        }),
        HostMessage::Search {
            query,
            result_count,
        } => handle.track_search(query, result_count),
        HostMessage::CartAdd {
            service_id,
            quantity,
        } => handle.track_cart_add(service_id, quantity),
        HostMessage::CartRemove {
            service_id,
            quantity,
        } => handle.track_cart_remove(service_id, quantity),
        HostMessage::ServiceView { service_id } => handle.track_service_view(service_id),
        HostMessage::FilterApply { filter, value } => handle.track_filter_apply(filter, value),
        HostMessage::FormSubmit { form, success } => handle.track_form_submit(form, success),
        HostMessage::Navigate(event) => context.navigation_bus().publish(event),
        HostMessage::Online => context.connectivity_bus().publish(ConnectivityEvent::Online),
        HostMessage::Offline => context.connectivity_bus().publish(ConnectivityEvent::Offline),
        HostMessage::Mount { component } => handle.sample_on_mount(component),
        HostMessage::Error {
            kind,
            message,
            stack_trace,
            component,
        } => handle.track_error(kind, message, stack_trace, component),
        HostMessage::User { id } => handle.set_user(id),
        HostMessage::Report => handle.report_now(),
        HostMessage::Flush => {
            let outcome = handle.flush_now().await?;
            return Some(json!({ "flush": format!("{outcome:?}") }));
        }
        HostMessage::Stats => {
            let stats = handle.get_stats().await?;
            return serde_json::to_value(stats).ok();
        }
    }
    None
}
