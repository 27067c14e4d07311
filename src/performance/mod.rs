mod host;
mod sampler;

pub use host::{HostEnvironment, ProcessHost};
pub use sampler::{
    derive_snapshot, measure_action, measure_sync, summarize_resources, ActionTiming,
    PerformanceSampler,
};
