use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::models::{
    ActionOutcome, MemorySnapshot, NavigationTiming, PaintTiming, PerformanceSnapshot,
    ResourceEntry, ResourceTimingSummary,
};

use super::HostEnvironment;

const ENABLE_LOGS: bool = true;

use crate::log_info;

const SLOWEST_RESOURCES: usize = 5;

/// Wall-clock duration of one measured action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionTiming {
    pub name: String,
    pub duration_ms: f64,
    pub outcome: ActionOutcome,
    pub finished_at: DateTime<Utc>,
}

/// Runs `action` and times it. The duration is taken the same way whether
/// the action succeeds or fails.
pub async fn measure_action<F, T, E>(name: &str, action: F) -> (Result<T, E>, ActionTiming)
where
    F: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let result = action.await;
    let timing = finish_timing(name, started, result.is_ok());
    (result, timing)
}

/// Synchronous counterpart of [`measure_action`].
pub fn measure_sync<F, T, E>(name: &str, action: F) -> (Result<T, E>, ActionTiming)
where
    F: FnOnce() -> Result<T, E>,
{
    let started = Instant::now();
    let result = action();
    let timing = finish_timing(name, started, result.is_ok());
    (result, timing)
}

fn finish_timing(name: &str, started: Instant, succeeded: bool) -> ActionTiming {
    let duration_ms = started.elapsed().as_secs_f64() * 1_000.0;
    let outcome = if succeeded {
        ActionOutcome::Succeeded
    } else {
        ActionOutcome::Failed
    };
    log_info!("action '{name}' took {duration_ms:.1}ms ({outcome:?})");

    ActionTiming {
        name: name.to_string(),
        duration_ms,
        outcome,
        finished_at: Utc::now(),
    }
}

/// Captures navigation and paint timing into the current [`PerformanceSnapshot`].
pub struct PerformanceSampler {
    host: Arc<dyn HostEnvironment>,
    current: PerformanceSnapshot,
    last_action: Option<ActionTiming>,
}

impl PerformanceSampler {
    pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
        let current = PerformanceSnapshot::empty(Utc::now(), host.user_agent(), host.page_url());
        Self {
            host,
            current,
            last_action: None,
        }
    }

    /// Waits for the host's next frame, then recomputes the snapshot.
    /// `requested_at` is when the mount (or navigation) happened.
    pub async fn sample_on_mount(
        &mut self,
        component_name: &str,
        requested_at: Instant,
    ) -> &PerformanceSnapshot {
        self.host.next_frame().await;

        let component_load_time = requested_at.elapsed().as_secs_f64() * 1_000.0;
        let navigation = self.host.navigation_timing();
        let paint = self.host.paint_timing();

        let mut snapshot = derive_snapshot(
            navigation.as_ref(),
            &paint,
            Utc::now(),
            self.host.user_agent(),
            self.host.page_url(),
        );
        snapshot.component_name = component_name.to_string();
        snapshot.component_load_time = component_load_time;
        snapshot.interface_response_time = self
            .last_action
            .as_ref()
            .map(|timing| timing.duration_ms)
            .unwrap_or(0.0);

        self.current = snapshot;
        &self.current
    }

    pub fn record_action(&mut self, timing: ActionTiming) {
        self.current.interface_response_time = timing.duration_ms;
        self.last_action = Some(timing);
    }

    pub fn last_action(&self) -> Option<&ActionTiming> {
        self.last_action.as_ref()
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        self.current.clone()
    }

    pub fn sample_memory(&self) -> Option<MemorySnapshot> {
        self.host.memory()
    }

    pub fn resource_summary(&self) -> ResourceTimingSummary {
        summarize_resources(self.host.resource_entries())
    }
}

/// Derives the timing fields from raw navigation and paint marks.
pub fn derive_snapshot(
    navigation: Option<&NavigationTiming>,
    paint: &PaintTiming,
    timestamp: DateTime<Utc>,
    user_agent: String,
    page_url: String,
) -> PerformanceSnapshot {
    let mut snapshot = PerformanceSnapshot::empty(timestamp, user_agent, page_url);

    if let Some(nav) = navigation {
        snapshot.navigation_time = span(nav.fetch_start, nav.response_end);
        snapshot.dom_content_loaded = span(nav.fetch_start, nav.dom_content_loaded_event_end);
        snapshot.initial_load_time = span(nav.fetch_start, nav.load_event_end);
        snapshot.render_time = span(nav.dom_interactive, nav.dom_complete);
    }
    snapshot.first_contentful_paint = paint.first_contentful_paint.unwrap_or(0.0);
    snapshot.largest_contentful_paint = paint.largest_contentful_paint.unwrap_or(0.0);

    snapshot
}

fn span(start: f64, end: f64) -> f64 {
    (end - start).max(0.0)
}

pub fn summarize_resources(mut entries: Vec<ResourceEntry>) -> ResourceTimingSummary {
    if entries.is_empty() {
        return ResourceTimingSummary::default();
    }

    let total_resources = entries.len();
    let total_transfer_size = entries.iter().map(|entry| entry.transfer_size).sum();
    let average_duration =
        entries.iter().map(|entry| entry.duration).sum::<f64>() / total_resources as f64;

    entries.sort_by(|a, b| b.duration.total_cmp(&a.duration));
    entries.truncate(SLOWEST_RESOURCES);

    ResourceTimingSummary {
        total_resources,
        total_transfer_size,
        average_duration,
        slowest: entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceClass, DeviceInfo};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedHost {
        navigation: Option<NavigationTiming>,
        memory: Option<MemorySnapshot>,
    }

    #[async_trait]
    impl HostEnvironment for FixedHost {
        fn navigation_timing(&self) -> Option<NavigationTiming> {
            self.navigation.clone()
        }

        fn paint_timing(&self) -> PaintTiming {
            PaintTiming {
                first_contentful_paint: Some(310.0),
                largest_contentful_paint: None,
            }
        }

        fn memory(&self) -> Option<MemorySnapshot> {
            self.memory.clone()
        }

        fn resource_entries(&self) -> Vec<ResourceEntry> {
            Vec::new()
        }

        fn device(&self) -> DeviceInfo {
            DeviceInfo {
                screen_width: 390,
                screen_height: 844,
                device_class: DeviceClass::Mobile,
                connection_type: "4g".into(),
                language: "en-US".into(),
                timezone: "UTC".into(),
            }
        }

        fn user_agent(&self) -> String {
            "test-agent".into()
        }

        fn page_url(&self) -> String {
            "https://shop.example/services".into()
        }
    }

    fn navigation() -> NavigationTiming {
        NavigationTiming {
            fetch_start: 10.0,
            response_end: 130.0,
            dom_interactive: 400.0,
            dom_content_loaded_event_end: 450.0,
            dom_complete: 700.0,
            load_event_end: 720.0,
        }
    }

    #[test]
    fn derives_spans_from_navigation_marks() {
        let snapshot = derive_snapshot(
            Some(&navigation()),
            &PaintTiming::default(),
            Utc::now(),
            "ua".into(),
            "/".into(),
        );

        assert_eq!(snapshot.navigation_time, 120.0);
        assert_eq!(snapshot.dom_content_loaded, 440.0);
        assert_eq!(snapshot.initial_load_time, 710.0);
        assert_eq!(snapshot.render_time, 300.0);
        assert_eq!(snapshot.first_contentful_paint, 0.0);
    }

    #[test]
    fn unfinished_marks_clamp_to_zero() {
        let mut nav = navigation();
        nav.load_event_end = 0.0;
        let snapshot =
            derive_snapshot(Some(&nav), &PaintTiming::default(), Utc::now(), "ua".into(), "/".into());
        assert_eq!(snapshot.initial_load_time, 0.0);
    }

    #[tokio::test]
    async fn mount_sample_reads_host_after_frame() {
        let host = Arc::new(FixedHost {
            navigation: Some(navigation()),
            memory: None,
        });
        let mut sampler = PerformanceSampler::new(host);

        let snapshot = sampler
            .sample_on_mount("ServiceList", Instant::now())
            .await
            .clone();

        assert_eq!(snapshot.component_name, "ServiceList");
        assert_eq!(snapshot.first_contentful_paint, 310.0);
        assert_eq!(snapshot.largest_contentful_paint, 0.0);
        assert_eq!(snapshot.page_url, "https://shop.example/services");
        assert!(snapshot.component_load_time >= 0.0);
    }

    #[test]
    fn memory_absent_is_none() {
        let sampler = PerformanceSampler::new(Arc::new(FixedHost {
            navigation: None,
            memory: None,
        }));
        assert!(sampler.sample_memory().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn measure_action_times_success_and_failure_alike() {
        let (ok, ok_timing) = measure_action("load-services", async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok::<_, String>(3)
        })
        .await;
        let (err, err_timing) = measure_action("checkout", async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Err::<u32, _>("payment declined".to_string())
        })
        .await;

        assert_eq!(ok, Ok(3));
        assert_eq!(err, Err("payment declined".to_string()));
        assert_eq!(ok_timing.outcome, ActionOutcome::Succeeded);
        assert_eq!(err_timing.outcome, ActionOutcome::Failed);
        assert!(ok_timing.duration_ms >= 40.0);
        assert!(err_timing.duration_ms >= 40.0);
    }

    #[test]
    fn recorded_action_feeds_interface_response_time() {
        let mut sampler = PerformanceSampler::new(Arc::new(FixedHost {
            navigation: None,
            memory: None,
        }));
        let (_, timing) = measure_sync("apply-filter", || Ok::<(), ()>(()));
        let duration = timing.duration_ms;
        sampler.record_action(timing);

        assert_eq!(sampler.snapshot().interface_response_time, duration);
        assert_eq!(sampler.last_action().unwrap().name, "apply-filter");
    }

    #[test]
    fn resource_summary_keeps_slowest_five() {
        let entries = (1..=7)
            .map(|i| ResourceEntry {
                name: format!("asset-{i}.js"),
                duration: f64::from(i) * 10.0,
                transfer_size: 100,
            })
            .collect();

        let summary = summarize_resources(entries);
        assert_eq!(summary.total_resources, 7);
        assert_eq!(summary.total_transfer_size, 700);
        assert_eq!(summary.average_duration, 40.0);
        assert_eq!(summary.slowest.len(), 5);
        assert_eq!(summary.slowest[0].name, "asset-7.js");
    }
}
