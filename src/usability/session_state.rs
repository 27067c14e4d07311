use chrono::{DateTime, Utc};
use rand::{distributions::Uniform, Rng};

use crate::models::{ErrorRecord, SessionRecord};

const SESSION_ID_PREFIX: &str = "session";
const SESSION_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Builds `session_<epoch-ms>_<random base36>`. Unique enough to tell page
/// loads apart, not a security token.
pub fn generate_session_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let alphabet = Uniform::from(0..BASE36.len());
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| BASE36[rng.sample(alphabet)] as char)
        .collect();

    format!("{SESSION_ID_PREFIX}_{}_{suffix}", now.timestamp_millis())
}

/// Mutable record of the current browsing session.
///
/// Owned by the coordinator task of a [`crate::TelemetryContext`]; the
/// mutation entry points are crate-private so only the aggregator and
/// error tracking can touch the counters.
#[derive(Debug, Clone)]
pub struct SessionState {
    record: SessionRecord,
    current_page: Option<(String, DateTime<Utc>)>,
}

impl SessionState {
    pub fn create(now: DateTime<Utc>) -> Self {
        Self::with_id(generate_session_id(now), now)
    }

    pub fn with_id(session_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            record: SessionRecord::new(session_id, started_at),
            current_page: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.session_id
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn current_page(&self) -> Option<&str> {
        self.current_page.as_ref().map(|(path, _)| path.as_str())
    }

    /// Copy of the record with time on the page still open folded in.
    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionRecord {
        let mut record = self.record.clone();
        if let Some((path, entered_at)) = &self.current_page {
            *record.time_per_page.entry(path.clone()).or_insert(0) += elapsed_ms(*entered_at, now);
        }
        record
    }

    pub(crate) fn count_click(&mut self) {
        self.record.total_clicks += 1;
    }

    pub(crate) fn count_page_view(&mut self) {
        self.record.total_page_views += 1;
    }

    pub(crate) fn count_cart_interaction(&mut self) {
        self.record.cart_interaction_count += 1;
    }

    pub(crate) fn push_search_query(&mut self, query: &str) {
        self.record.search_queries.push(query.to_string());
    }

    pub(crate) fn push_viewed_service(&mut self, service_id: &str) {
        self.record.viewed_service_ids.push(service_id.to_string());
    }

    pub(crate) fn record_error(&mut self, error: ErrorRecord) {
        self.record.errors.push(error);
    }

    /// Closes out time on the previous page and starts the clock on `path`.
    pub(crate) fn enter_page(&mut self, path: &str, at: DateTime<Utc>) {
        if let Some((previous, entered_at)) = self.current_page.take() {
            *self.record.time_per_page.entry(previous).or_insert(0) += elapsed_ms(entered_at, at);
        }
        self.current_page = Some((path.to_string(), at));
    }
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn session_id_has_prefix_time_and_suffix() {
        let now = at(0);
        let id = generate_session_id(now);
        let parts: Vec<&str> = id.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), SESSION_SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn new_session_starts_with_one_page_view() {
        let state = SessionState::create(at(0));
        assert_eq!(state.record().total_page_views, 1);
        assert_eq!(state.record().total_clicks, 0);
        assert!(state.record().search_queries.is_empty());
    }

    #[test]
    fn time_per_page_accumulates_across_visits() {
        let mut state = SessionState::with_id("s".into(), at(0));
        state.enter_page("/", at(0));
        state.enter_page("/services", at(1_500));
        state.enter_page("/", at(2_000));
        state.enter_page("/cart", at(2_250));

        let record = state.record();
        assert_eq!(record.time_per_page.get("/"), Some(&1_750));
        assert_eq!(record.time_per_page.get("/services"), Some(&500));
        assert_eq!(state.current_page(), Some("/cart"));
    }

    #[test]
    fn snapshot_includes_open_page_without_mutating() {
        let mut state = SessionState::with_id("s".into(), at(0));
        state.enter_page("/checkout", at(0));

        let snapshot = state.snapshot(at(0) + Duration::milliseconds(800));
        assert_eq!(snapshot.time_per_page.get("/checkout"), Some(&800));
        assert!(state.record().time_per_page.is_empty());
    }

    #[test]
    fn clock_going_backwards_counts_as_zero() {
        let mut state = SessionState::with_id("s".into(), at(1_000));
        state.enter_page("/", at(1_000));
        state.enter_page("/about", at(0));
        assert_eq!(state.record().time_per_page.get("/"), Some(&0));
    }
}
