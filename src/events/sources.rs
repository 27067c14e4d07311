use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep_until, Instant};

use crate::models::{InteractionType, Metadata};

use super::{EventBus, Subscription};

const ENABLE_LOGS: bool = false;

use crate::log_debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    pub from: Option<String>,
    pub to: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UiEventKind {
    Click,
    Scroll,
    Input,
}

impl From<UiEventKind> for InteractionType {
    fn from(kind: UiEventKind) -> Self {
        match kind {
            UiEventKind::Click => InteractionType::Click,
            UiEventKind::Scroll => InteractionType::Scroll,
            UiEventKind::Input => InteractionType::Input,
        }
    }
}

/// What the UI layer knows about the element an event hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementDescriptor {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub tag: String,
}

impl ElementDescriptor {
    /// Best-effort identifier: the element id, else its first class, else its tag.
    pub fn target(&self) -> String {
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            return id.to_string();
        }
        if let Some(class) = self.classes.iter().find(|class| !class.is_empty()) {
            return class.clone();
        }
        if self.tag.is_empty() {
            "unknown".to_string()
        } else {
            self.tag.to_lowercase()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiEvent {
    pub kind: UiEventKind,
    pub element: ElementDescriptor,
}

/// Forwards raw UI events as interactions. Scrolls are debounced: a burst
/// is recorded once, `debounce` after its last event.
pub fn subscribe_ui_events<F>(bus: &EventBus<UiEvent>, debounce: Duration, mut sink: F) -> Subscription
where
    F: FnMut(InteractionType, String, Metadata) + Send + 'static,
{
    let mut receiver = bus.receiver();
    Subscription::spawn(move |cancel| async move {
        let mut pending_scroll: Option<String> = None;
        let mut deadline = Instant::now();

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Ok(UiEvent { kind: UiEventKind::Scroll, element }) => {
                        pending_scroll = Some(element.target());
                        deadline = Instant::now() + debounce;
                    }
                    Ok(UiEvent { kind, element }) => {
                        sink(kind.into(), element.target(), Metadata::new());
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log_debug!("ui listener skipped {skipped} events");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = sleep_until(deadline), if pending_scroll.is_some() => {
                    if let Some(target) = pending_scroll.take() {
                        sink(InteractionType::Scroll, target, Metadata::new());
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}

pub fn subscribe_navigation<F>(bus: &EventBus<NavigationEvent>, mut sink: F) -> Subscription
where
    F: FnMut(NavigationEvent) + Send + 'static,
{
    bus.subscribe(move |event| {
        sink(event);
        async {}
    })
}

pub fn subscribe_connectivity<F>(bus: &EventBus<ConnectivityEvent>, mut sink: F) -> Subscription
where
    F: FnMut(bool) + Send + 'static,
{
    bus.subscribe(move |event| {
        sink(event == ConnectivityEvent::Online);
        async {}
    })
}
