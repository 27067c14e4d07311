use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub kind: String,
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub occurred_at: DateTime<Utc>,
    pub stack_trace: Option<String>,
    pub component_context: Option<String>,
}

/// Everything observed about the current browsing session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    pub total_clicks: u64,
    pub total_page_views: u64,
    /// Accumulated milliseconds spent per path.
    pub time_per_page: HashMap<String, u64>,
    pub search_queries: Vec<String>,
    pub cart_interaction_count: u64,
    pub viewed_service_ids: Vec<String>,
    pub errors: Vec<ErrorRecord>,
}

impl SessionRecord {
    pub fn new(session_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            started_at,
            total_clicks: 0,
            total_page_views: 1,
            time_per_page: HashMap::new(),
            search_queries: Vec::new(),
            cart_interaction_count: 0,
            viewed_service_ids: Vec::new(),
            errors: Vec::new(),
        }
    }
}
