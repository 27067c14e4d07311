use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH_ENV: &str = "STOREFRONT_TELEMETRY_CONFIG";
pub const ENABLED_ENV: &str = "STOREFRONT_TELEMETRY_ENABLED";
pub const ENDPOINT_ENV: &str = "STOREFRONT_TELEMETRY_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetrySettings {
    /// Gates every network operation. When false, payloads are dropped.
    pub enabled: bool,
    pub endpoint: String,
    pub report_interval_secs: u64,
    pub flush_interval_secs: u64,
    pub send_timeout_ms: u64,
    pub flush_timeout_ms: u64,
    pub batch_size: usize,
    pub queue_capacity: usize,
    pub queue_retain: usize,
    /// Failed flushes a payload survives before eviction; 0 keeps it forever.
    pub max_delivery_attempts: u32,
    pub scroll_debounce_ms: u64,
    pub top_interactions_limit: usize,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:8080/api/metrics".into(),
            report_interval_secs: 30,
            flush_interval_secs: 30,
            send_timeout_ms: 5_000,
            flush_timeout_ms: 3_000,
            batch_size: 10,
            queue_capacity: 100,
            queue_retain: 50,
            max_delivery_attempts: 5,
            scroll_debounce_ms: 100,
            top_interactions_limit: 10,
        }
    }
}

impl TelemetrySettings {
    /// Reads settings from `path`. A missing file yields defaults; a file that
    /// does not parse is logged and also yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read telemetry settings from {}", path.display()))?;

        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!(
                "Ignoring malformed telemetry settings in {}: {err}",
                path.display()
            );
            Self::default()
        }))
    }

    /// Loads from `STOREFRONT_TELEMETRY_CONFIG` (if set) and applies env overrides.
    pub fn from_env() -> Result<Self> {
        let mut settings = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        settings.apply_overrides(
            std::env::var(ENABLED_ENV).ok().as_deref(),
            std::env::var(ENDPOINT_ENV).ok().as_deref(),
        );
        Ok(settings)
    }

    pub fn apply_overrides(&mut self, enabled: Option<&str>, endpoint: Option<&str>) {
        if let Some(value) = enabled {
            self.enabled = value == "1" || value.eq_ignore_ascii_case("true");
        }
        if let Some(value) = endpoint.filter(|value| !value.is_empty()) {
            self.endpoint = value.to_string();
        }
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs.max(1))
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = TelemetrySettings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, TelemetrySettings::default());
        assert_eq!(settings.send_timeout(), Duration::from_secs(5));
        assert_eq!(settings.flush_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"enabled": false, "batchSize": 4}}"#).unwrap();

        let settings = TelemetrySettings::load(file.path()).unwrap();
        assert!(!settings.enabled);
        assert_eq!(settings.batch_size, 4);
        assert_eq!(settings.queue_capacity, 100);
        assert_eq!(settings.queue_retain, 50);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let settings = TelemetrySettings::load(file.path()).unwrap();
        assert_eq!(settings, TelemetrySettings::default());
    }

    #[test]
    fn overrides_accept_true_and_one() {
        let mut settings = TelemetrySettings::default();
        settings.apply_overrides(Some("0"), None);
        assert!(!settings.enabled);
        settings.apply_overrides(Some("TRUE"), Some("https://collector.example/metrics"));
        assert!(settings.enabled);
        assert_eq!(settings.endpoint, "https://collector.example/metrics");

        settings.apply_overrides(None, Some(""));
        assert_eq!(settings.endpoint, "https://collector.example/metrics");
    }
}
