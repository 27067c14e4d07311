//! Explicit event sources the pipeline listens to.
//!
//! Collaborators (the router, the connectivity monitor, the UI layer)
//! publish onto an [`EventBus`]; the pipeline subscribes and gets back a
//! [`Subscription`] that stops the listener when disposed or dropped.

mod bus;
mod sources;

pub use bus::{EventBus, Subscription};
pub use sources::{
    subscribe_connectivity, subscribe_navigation, subscribe_ui_events, ConnectivityEvent,
    ElementDescriptor, NavigationEvent, UiEvent, UiEventKind,
};
