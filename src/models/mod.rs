mod announcement;
mod detection;
mod telemetry;
mod voice;

pub use announcement::{AnnouncementRequest, Priority};
pub use detection::{DetectionFrame, DetectionSample, DistanceReading};
pub use telemetry::{Posture, TelemetryRecord};
pub use voice::VoiceState;

pub use crate::db::HistoryEntry;
