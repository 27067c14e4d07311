mod interaction;
mod payload;
mod performance;
mod session;

pub use interaction::{InteractionRecord, InteractionType, Metadata, MetadataValue};
pub use payload::{
    DeviceClass, DeviceInfo, SessionInfo, TelemetryPayload, TelemetryStats, UsabilityReport,
};
pub use performance::{
    ActionOutcome, MemorySnapshot, NavigationTiming, PaintTiming, PerformanceSnapshot,
    ResourceEntry, ResourceTimingSummary,
};
pub use session::{ErrorRecord, SessionRecord};
