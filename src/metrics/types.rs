use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

/// Running totals for everything the pipeline accepted, dropped or failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineCounts {
    pub samples_processed: u64,
    pub no_estimate: u64,
    pub announcements_emitted: u64,
    pub suppressed_cooldown: u64,
    pub suppressed_queue_full: u64,
    pub dropped_empty: u64,
    pub speech_delivered: u64,
    pub speech_failures: u64,
    pub telemetry_records: u64,
    pub telemetry_parse_errors: u64,
    pub telemetry_log_failures: u64,
    pub alerts_raised: u64,
    pub voice_activations: u64,
    pub voice_unintelligible: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub system: SystemMetrics,
    pub counts: PipelineCounts,
}
