use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{InteractionRecord, InteractionType, Metadata};

use super::SessionState;

/// Metadata key carrying a timing sample for [`InteractionAggregator::average_duration`].
pub const DURATION_METADATA_KEY: &str = "durationMs";
pub const SERVICE_ID_METADATA_KEY: &str = "serviceId";
pub const QUERY_METADATA_KEY: &str = "query";

#[derive(Debug, Default, Clone, Copy)]
struct DurationStats {
    total_ms: f64,
    samples: u64,
}

/// Merges interaction events by `(type, target)` and keeps the session
/// counters in step with every merge.
#[derive(Debug, Default)]
pub struct InteractionAggregator {
    interactions: HashMap<(InteractionType, String), InteractionRecord>,
    durations: HashMap<InteractionType, DurationStats>,
}

impl InteractionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one event. Both the keyed record and the session counters are
    /// updated before this returns.
    pub fn record(
        &mut self,
        session: &mut SessionState,
        kind: InteractionType,
        target: &str,
        metadata: Metadata,
        at: DateTime<Utc>,
    ) {
        if let Some(duration) = metadata
            .get(DURATION_METADATA_KEY)
            .and_then(|value| value.as_number())
        {
            let stats = self.durations.entry(kind).or_default();
            stats.total_ms += duration;
            stats.samples += 1;
        }

        match kind {
            InteractionType::Click => session.count_click(),
            InteractionType::CartAdd | InteractionType::CartRemove => {
                session.count_cart_interaction()
            }
            InteractionType::ServiceView => {
                if let Some(service_id) = metadata
                    .get(SERVICE_ID_METADATA_KEY)
                    .and_then(|value| value.as_text())
                {
                    session.push_viewed_service(service_id);
                }
            }
            InteractionType::Search => {
                if let Some(query) = metadata
                    .get(QUERY_METADATA_KEY)
                    .and_then(|value| value.as_text())
                {
                    session.push_search_query(query);
                }
            }
            InteractionType::Navigation => {
                session.count_page_view();
                session.enter_page(target, at);
            }
            InteractionType::Scroll
            | InteractionType::Input
            | InteractionType::FilterApply
            | InteractionType::FormSubmit => {}
        }

        let entry = self
            .interactions
            .entry((kind, target.to_string()))
            .or_insert_with(|| InteractionRecord {
                kind,
                target: target.to_string(),
                count: 0,
                last_observed_at: at,
                metadata: Metadata::new(),
            });
        entry.count += 1;
        entry.last_observed_at = at;
        entry.metadata = metadata;
    }

    /// The `limit` most frequent interactions, highest count first. Order
    /// among equal counts is unspecified.
    pub fn top_interactions(&self, limit: usize) -> Vec<InteractionRecord> {
        let mut records: Vec<&InteractionRecord> = self.interactions.values().collect();
        records.sort_unstable_by(|a, b| b.count.cmp(&a.count));
        records.into_iter().take(limit).cloned().collect()
    }

    /// Mean `durationMs` over recorded events of `kind`; 0 when none carried timing.
    pub fn average_duration(&self, kind: InteractionType) -> f64 {
        match self.durations.get(&kind) {
            Some(stats) if stats.samples > 0 => stats.total_ms / stats.samples as f64,
            _ => 0.0,
        }
    }

    pub fn get(&self, kind: InteractionType, target: &str) -> Option<&InteractionRecord> {
        self.interactions.get(&(kind, target.to_string()))
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataValue;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn meta(pairs: &[(&str, MetadataValue)]) -> Metadata {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    fn fresh() -> (InteractionAggregator, SessionState) {
        (
            InteractionAggregator::new(),
            SessionState::with_id("session_test".into(), at(0)),
        )
    }

    proptest! {
        #[test]
        fn repeated_records_merge_into_one(calls in 1usize..64, step in 1i64..10_000) {
            let (mut aggregator, mut session) = fresh();
            for i in 0..calls {
                aggregator.record(
                    &mut session,
                    InteractionType::Click,
                    "#book-now",
                    Metadata::new(),
                    at(i as i64 * step),
                );
            }

            let record = aggregator.get(InteractionType::Click, "#book-now").unwrap();
            prop_assert_eq!(record.count, calls as u64);
            prop_assert_eq!(record.last_observed_at, at((calls as i64 - 1) * step));
            prop_assert_eq!(aggregator.len(), 1);
        }
    }

    #[test]
    fn latest_metadata_wins() {
        let (mut aggregator, mut session) = fresh();
        aggregator.record(
            &mut session,
            InteractionType::FilterApply,
            "category",
            meta(&[("value", "plumbing".into())]),
            at(0),
        );
        aggregator.record(
            &mut session,
            InteractionType::FilterApply,
            "category",
            meta(&[("value", "electrical".into())]),
            at(10),
        );

        let record = aggregator
            .get(InteractionType::FilterApply, "category")
            .unwrap();
        assert_eq!(record.count, 2);
        assert_eq!(record.metadata.get("value"), Some(&MetadataValue::from("electrical")));
    }

    #[test]
    fn same_target_different_type_stays_separate() {
        let (mut aggregator, mut session) = fresh();
        aggregator.record(&mut session, InteractionType::Click, "search-box", Metadata::new(), at(0));
        aggregator.record(&mut session, InteractionType::Input, "search-box", Metadata::new(), at(1));
        assert_eq!(aggregator.len(), 2);
    }

    #[test]
    fn cart_events_bump_cart_counter_only() {
        let (mut aggregator, mut session) = fresh();
        aggregator.record(&mut session, InteractionType::CartAdd, "svc-1", Metadata::new(), at(0));
        aggregator.record(&mut session, InteractionType::CartRemove, "svc-1", Metadata::new(), at(1));

        assert_eq!(session.record().cart_interaction_count, 2);
        assert_eq!(session.record().total_clicks, 0);
    }

    #[test]
    fn click_bumps_click_counter_only() {
        let (mut aggregator, mut session) = fresh();
        aggregator.record(&mut session, InteractionType::Click, "#cta", Metadata::new(), at(0));

        assert_eq!(session.record().total_clicks, 1);
        assert_eq!(session.record().cart_interaction_count, 0);
    }

    #[test]
    fn service_view_needs_string_service_id() {
        let (mut aggregator, mut session) = fresh();
        aggregator.record(
            &mut session,
            InteractionType::ServiceView,
            "service-card",
            meta(&[(SERVICE_ID_METADATA_KEY, MetadataValue::Number(42.0))]),
            at(0),
        );
        aggregator.record(
            &mut session,
            InteractionType::ServiceView,
            "service-card",
            meta(&[(SERVICE_ID_METADATA_KEY, "svc-42".into())]),
            at(1),
        );

        assert_eq!(session.record().viewed_service_ids, vec!["svc-42".to_string()]);
        assert_eq!(
            aggregator
                .get(InteractionType::ServiceView, "service-card")
                .unwrap()
                .count,
            2
        );
    }

    #[test]
    fn search_appends_query_when_present() {
        let (mut aggregator, mut session) = fresh();
        aggregator.record(&mut session, InteractionType::Search, "search", Metadata::new(), at(0));
        aggregator.record(
            &mut session,
            InteractionType::Search,
            "search",
            meta(&[(QUERY_METADATA_KEY, "faucet repair".into())]),
            at(1),
        );

        assert_eq!(session.record().search_queries, vec!["faucet repair".to_string()]);
    }

    #[test]
    fn navigation_counts_page_view_and_moves_page() {
        let (mut aggregator, mut session) = fresh();
        session.enter_page("/", at(0));
        aggregator.record(&mut session, InteractionType::Navigation, "/services", Metadata::new(), at(400));

        assert_eq!(session.record().total_page_views, 2);
        assert_eq!(session.record().time_per_page.get("/"), Some(&400));
        assert_eq!(session.current_page(), Some("/services"));
    }

    #[test]
    fn top_interactions_sorted_by_count() {
        let (mut aggregator, mut session) = fresh();
        let plan = [("a", 5), ("b", 3), ("c", 3), ("d", 1)];
        for (target, times) in plan {
            for i in 0..times {
                aggregator.record(&mut session, InteractionType::Click, target, Metadata::new(), at(i));
            }
        }

        let top = aggregator.top_interactions(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].target, "a");
        assert_eq!(top[0].count, 5);
        assert_eq!(top[1].count, 3);
        assert!(top[1].target == "b" || top[1].target == "c");

        assert_eq!(aggregator.top_interactions(10).len(), 4);
    }

    #[test]
    fn average_duration_defaults_to_zero() {
        let (mut aggregator, mut session) = fresh();
        assert_eq!(aggregator.average_duration(InteractionType::FormSubmit), 0.0);

        aggregator.record(&mut session, InteractionType::FormSubmit, "checkout", Metadata::new(), at(0));
        assert_eq!(aggregator.average_duration(InteractionType::FormSubmit), 0.0);

        aggregator.record(
            &mut session,
            InteractionType::FormSubmit,
            "checkout",
            meta(&[(DURATION_METADATA_KEY, MetadataValue::Number(120.0))]),
            at(1),
        );
        aggregator.record(
            &mut session,
            InteractionType::FormSubmit,
            "signup",
            meta(&[(DURATION_METADATA_KEY, MetadataValue::Number(80.0))]),
            at(2),
        );
        assert_eq!(aggregator.average_duration(InteractionType::FormSubmit), 100.0);
        assert_eq!(aggregator.average_duration(InteractionType::Click), 0.0);
    }
}
