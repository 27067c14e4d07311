use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum InteractionType {
    Click,
    Scroll,
    Input,
    Search,
    Navigation,
    CartAdd,
    CartRemove,
    ServiceView,
    FilterApply,
    FormSubmit,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Click => "click",
            InteractionType::Scroll => "scroll",
            InteractionType::Input => "input",
            InteractionType::Search => "search",
            InteractionType::Navigation => "navigation",
            InteractionType::CartAdd => "cartAdd",
            InteractionType::CartRemove => "cartRemove",
            InteractionType::ServiceView => "serviceView",
            InteractionType::FilterApply => "filterApply",
            InteractionType::FormSubmit => "formSubmit",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single metadata value attached to an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        MetadataValue::Number(f64::from(value))
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Flag(value)
    }
}

pub type Metadata = HashMap<String, MetadataValue>;

/// Aggregated interactions for one `(type, target)` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub target: String,
    pub count: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_observed_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}
