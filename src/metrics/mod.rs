mod types;

pub use types::{MetricsSnapshot, PipelineCounts, SystemMetrics};

use chrono::Utc;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

/// Countable pipeline events. Every drop or suppression in the runtime bumps one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    SamplesProcessed,
    NoEstimate,
    AnnouncementsEmitted,
    SuppressedCooldown,
    SuppressedQueueFull,
    DroppedEmpty,
    SpeechDelivered,
    SpeechFailures,
    TelemetryRecords,
    TelemetryParseErrors,
    TelemetryLogFailures,
    AlertsRaised,
    VoiceActivations,
    VoiceUnintelligible,
}

#[derive(Default)]
struct Counters {
    samples_processed: AtomicU64,
    no_estimate: AtomicU64,
    announcements_emitted: AtomicU64,
    suppressed_cooldown: AtomicU64,
    suppressed_queue_full: AtomicU64,
    dropped_empty: AtomicU64,
    speech_delivered: AtomicU64,
    speech_failures: AtomicU64,
    telemetry_records: AtomicU64,
    telemetry_parse_errors: AtomicU64,
    telemetry_log_failures: AtomicU64,
    alerts_raised: AtomicU64,
    voice_activations: AtomicU64,
    voice_unintelligible: AtomicU64,
}

impl Counters {
    fn slot(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::SamplesProcessed => &self.samples_processed,
            Counter::NoEstimate => &self.no_estimate,
            Counter::AnnouncementsEmitted => &self.announcements_emitted,
            Counter::SuppressedCooldown => &self.suppressed_cooldown,
            Counter::SuppressedQueueFull => &self.suppressed_queue_full,
            Counter::DroppedEmpty => &self.dropped_empty,
            Counter::SpeechDelivered => &self.speech_delivered,
            Counter::SpeechFailures => &self.speech_failures,
            Counter::TelemetryRecords => &self.telemetry_records,
            Counter::TelemetryParseErrors => &self.telemetry_parse_errors,
            Counter::TelemetryLogFailures => &self.telemetry_log_failures,
            Counter::AlertsRaised => &self.alerts_raised,
            Counter::VoiceActivations => &self.voice_activations,
            Counter::VoiceUnintelligible => &self.voice_unintelligible,
        }
    }

    fn counts(&self) -> PipelineCounts {
        let load = |slot: &AtomicU64| slot.load(Ordering::Relaxed);
        PipelineCounts {
            samples_processed: load(&self.samples_processed),
            no_estimate: load(&self.no_estimate),
            announcements_emitted: load(&self.announcements_emitted),
            suppressed_cooldown: load(&self.suppressed_cooldown),
            suppressed_queue_full: load(&self.suppressed_queue_full),
            dropped_empty: load(&self.dropped_empty),
            speech_delivered: load(&self.speech_delivered),
            speech_failures: load(&self.speech_failures),
            telemetry_records: load(&self.telemetry_records),
            telemetry_parse_errors: load(&self.telemetry_parse_errors),
            telemetry_log_failures: load(&self.telemetry_log_failures),
            alerts_raised: load(&self.alerts_raised),
            voice_activations: load(&self.voice_activations),
            voice_unintelligible: load(&self.voice_unintelligible),
        }
    }
}

struct SystemProbe {
    system: System,
    pid: Pid,
}

/// Shared metrics handle. Counting is lock-free so the speech thread and the
/// synchronous `offer` path can bump counters without touching the runtime.
#[derive(Clone)]
pub struct MetricsCollector {
    counters: Arc<Counters>,
    probe: Arc<Mutex<SystemProbe>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // Initial refresh to establish baseline for CPU calculation
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            counters: Arc::new(Counters::default()),
            probe: Arc::new(Mutex::new(SystemProbe { system, pid })),
        }
    }

    pub fn incr(&self, counter: Counter) {
        self.counters.slot(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub fn counts(&self) -> PipelineCounts {
        self.counters.counts()
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut probe = self.probe.lock().await;
        let pid = probe.pid;
        probe.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let system = match probe.system.process(pid) {
            Some(process) => SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            },
            None => SystemMetrics::default(),
        };

        MetricsSnapshot {
            taken_at: Utc::now(),
            system,
            counts: self.counters.counts(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
