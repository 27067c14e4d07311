use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    InteractionRecord, MemorySnapshot, PerformanceSnapshot, ResourceTimingSummary, SessionRecord,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    pub fn from_screen_width(width: u32) -> Self {
        if width < 768 {
            DeviceClass::Mobile
        } else if width < 1024 {
            DeviceClass::Tablet
        } else {
            DeviceClass::Desktop
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub screen_width: u32,
    pub screen_height: u32,
    pub device_class: DeviceClass,
    pub connection_type: String,
    pub language: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub user_id: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsabilityReport {
    pub top_interactions: Vec<InteractionRecord>,
    pub session: SessionRecord,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub page_url: String,
}

/// One complete telemetry snapshot, built fresh for each delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryPayload {
    pub performance: PerformanceSnapshot,
    pub usability: UsabilityReport,
    pub device_info: DeviceInfo,
    pub session_info: SessionInfo,
}

/// Read model handed back to UI collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryStats {
    pub session_data: SessionRecord,
    pub top_interactions: Vec<InteractionRecord>,
    pub memory: Option<MemorySnapshot>,
    pub resource_timing: ResourceTimingSummary,
}
