use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Navigation timing marks, in milliseconds from the page's time origin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub fetch_start: f64,
    pub response_end: f64,
    pub dom_interactive: f64,
    pub dom_content_loaded_event_end: f64,
    pub dom_complete: f64,
    pub load_event_end: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaintTiming {
    pub first_contentful_paint: Option<f64>,
    pub largest_contentful_paint: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub limit_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    pub name: String,
    pub duration: f64,
    pub transfer_size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTimingSummary {
    pub total_resources: usize,
    pub total_transfer_size: u64,
    pub average_duration: f64,
    pub slowest: Vec<ResourceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub interface_response_time: f64,
    pub component_load_time: f64,
    pub render_time: f64,
    pub navigation_time: f64,
    pub initial_load_time: f64,
    pub dom_content_loaded: f64,
    pub first_contentful_paint: f64,
    pub largest_contentful_paint: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub page_url: String,
    pub component_name: String,
}

impl PerformanceSnapshot {
    /// A snapshot with every timing at zero, used before the first mount sample.
    pub fn empty(timestamp: DateTime<Utc>, user_agent: String, page_url: String) -> Self {
        Self {
            interface_response_time: 0.0,
            component_load_time: 0.0,
            render_time: 0.0,
            navigation_time: 0.0,
            initial_load_time: 0.0,
            dom_content_loaded: 0.0,
            first_contentful_paint: 0.0,
            largest_contentful_paint: 0.0,
            timestamp,
            user_agent,
            page_url,
            component_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActionOutcome {
    Succeeded,
    Failed,
}
