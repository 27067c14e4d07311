//! Facade over the usability and performance read models.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{
    ErrorRecord, InteractionType, Metadata, MetadataValue, SessionInfo, TelemetryPayload,
    TelemetryStats, UsabilityReport,
};
use crate::performance::{HostEnvironment, PerformanceSampler};
use crate::usability::{
    InteractionAggregator, SessionState, QUERY_METADATA_KEY, SERVICE_ID_METADATA_KEY,
};

pub const SEARCH_TARGET: &str = "search";
pub const CART_TARGET: &str = "cart";

pub struct TelemetryCollector {
    aggregator: InteractionAggregator,
    sampler: PerformanceSampler,
    session: SessionState,
    host: Arc<dyn HostEnvironment>,
    top_limit: usize,
}

impl TelemetryCollector {
    pub fn new(host: Arc<dyn HostEnvironment>, session: SessionState, top_limit: usize) -> Self {
        Self {
            aggregator: InteractionAggregator::new(),
            sampler: PerformanceSampler::new(Arc::clone(&host)),
            session,
            host,
            top_limit,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn aggregator(&self) -> &InteractionAggregator {
        &self.aggregator
    }

    pub fn sampler(&self) -> &PerformanceSampler {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut PerformanceSampler {
        &mut self.sampler
    }

    pub fn record(
        &mut self,
        kind: InteractionType,
        target: &str,
        metadata: Metadata,
        at: DateTime<Utc>,
    ) {
        self.aggregator
            .record(&mut self.session, kind, target, metadata, at);
    }

    pub fn enter_page(&mut self, path: &str, at: DateTime<Utc>) {
        self.session.enter_page(path, at);
    }

    pub fn track_error(&mut self, error: ErrorRecord) {
        self.session.record_error(error);
    }

    pub fn track_click(&mut self, target: &str, at: DateTime<Utc>) {
        self.record(InteractionType::Click, target, Metadata::new(), at);
    }

    pub fn track_search(&mut self, query: &str, result_count: Option<u32>, at: DateTime<Utc>) {
        let mut metadata = Metadata::new();
        metadata.insert(QUERY_METADATA_KEY.into(), query.into());
        if let Some(count) = result_count {
            metadata.insert("resultCount".into(), count.into());
        }
        self.record(InteractionType::Search, SEARCH_TARGET, metadata, at);
    }

    pub fn track_cart_add(&mut self, service_id: &str, quantity: u32, at: DateTime<Utc>) {
        self.record(
            InteractionType::CartAdd,
            CART_TARGET,
            cart_metadata(service_id, quantity),
            at,
        );
    }

    pub fn track_cart_remove(&mut self, service_id: &str, quantity: u32, at: DateTime<Utc>) {
        self.record(
            InteractionType::CartRemove,
            CART_TARGET,
            cart_metadata(service_id, quantity),
            at,
        );
    }

    pub fn track_service_view(&mut self, service_id: &str, at: DateTime<Utc>) {
        let mut metadata = Metadata::new();
        metadata.insert(SERVICE_ID_METADATA_KEY.into(), service_id.into());
        self.record(InteractionType::ServiceView, service_id, metadata, at);
    }

    pub fn track_filter_apply(&mut self, filter: &str, value: MetadataValue, at: DateTime<Utc>) {
        let mut metadata = Metadata::new();
        metadata.insert("value".into(), value);
        self.record(InteractionType::FilterApply, filter, metadata, at);
    }

    pub fn track_form_submit(&mut self, form: &str, succeeded: bool, at: DateTime<Utc>) {
        let mut metadata = Metadata::new();
        metadata.insert("success".into(), succeeded.into());
        self.record(InteractionType::FormSubmit, form, metadata, at);
    }

    /// Assembles a payload from current state. Nothing is stored.
    pub fn build_payload(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> TelemetryPayload {
        let user_agent = self.host.user_agent();
        let page_url = self.host.page_url();

        TelemetryPayload {
            performance: self.sampler.snapshot(),
            usability: UsabilityReport {
                top_interactions: self.aggregator.top_interactions(self.top_limit),
                session: self.session.snapshot(now),
                timestamp: now,
                user_agent,
                page_url,
            },
            device_info: self.host.device(),
            session_info: SessionInfo {
                session_id: session_id.to_string(),
                user_id: user_id.map(str::to_string),
                timestamp: now,
            },
        }
    }

    pub fn stats(&self, now: DateTime<Utc>) -> TelemetryStats {
        TelemetryStats {
            session_data: self.session.snapshot(now),
            top_interactions: self.aggregator.top_interactions(self.top_limit),
            memory: self.sampler.sample_memory(),
            resource_timing: self.sampler.resource_summary(),
        }
    }
}

fn cart_metadata(service_id: &str, quantity: u32) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(SERVICE_ID_METADATA_KEY.into(), service_id.into());
    metadata.insert("quantity".into(), quantity.into());
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::ProcessHost;

    fn collector() -> TelemetryCollector {
        let now = Utc::now();
        TelemetryCollector::new(
            Arc::new(ProcessHost::new("https://shop.example/")),
            SessionState::create(now),
            10,
        )
    }

    #[test]
    fn search_lands_in_stats_and_payload() {
        let mut collector = collector();
        let now = Utc::now();
        collector.track_search("faucet repair", Some(12), now);

        let stats = collector.stats(now);
        assert!(stats
            .session_data
            .search_queries
            .contains(&"faucet repair".to_string()));

        let session_id = collector.session().id().to_string();
        let payload = collector.build_payload(&session_id, Some("user-7"), now);
        assert!(payload
            .usability
            .session
            .search_queries
            .contains(&"faucet repair".to_string()));
        assert_eq!(payload.session_info.session_id, session_id);
        assert_eq!(payload.session_info.user_id.as_deref(), Some("user-7"));
    }

    #[test]
    fn cart_helpers_share_one_target() {
        let mut collector = collector();
        let now = Utc::now();
        collector.track_cart_add("svc-1", 2, now);
        collector.track_cart_add("svc-2", 1, now);
        collector.track_cart_remove("svc-1", 1, now);

        assert_eq!(collector.session().record().cart_interaction_count, 3);
        assert_eq!(
            collector
                .aggregator()
                .get(InteractionType::CartAdd, CART_TARGET)
                .unwrap()
                .count,
            2
        );
    }

    #[test]
    fn service_view_records_id() {
        let mut collector = collector();
        let now = Utc::now();
        collector.track_service_view("svc-77", now);
        collector.track_filter_apply("price", MetadataValue::Number(50.0), now);
        collector.track_form_submit("booking", true, now);
        collector.track_click("#hero-cta", now);

        let payload = collector.build_payload("s", None, now);
        assert_eq!(payload.usability.session.viewed_service_ids, vec!["svc-77"]);
        assert_eq!(payload.usability.session.total_clicks, 1);
        assert_eq!(payload.usability.top_interactions.len(), 4);
        assert!(payload.session_info.user_id.is_none());
    }

    #[test]
    fn errors_are_kept_in_order() {
        let mut collector = collector();
        for message in ["first", "second"] {
            collector.track_error(ErrorRecord {
                kind: "render".into(),
                message: message.into(),
                occurred_at: Utc::now(),
                stack_trace: None,
                component_context: Some("Checkout".into()),
            });
        }

        let errors = &collector.session().record().errors;
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "first");
        assert_eq!(errors[1].message, "second");
    }
}
