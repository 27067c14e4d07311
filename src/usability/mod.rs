mod aggregator;
mod session_state;

pub use aggregator::{
    InteractionAggregator, DURATION_METADATA_KEY, QUERY_METADATA_KEY, SERVICE_ID_METADATA_KEY,
};
pub use session_state::{generate_session_id, SessionState};
