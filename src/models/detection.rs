use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detected subject in one processed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSample {
    /// Detector class name, e.g. "face", "person", "bottle".
    pub subject_id: String,
    pub pixel_width: f64,
    /// Top-left corner of the bounding box in pixels, when the detector reports it.
    pub position: Option<[f64; 2]>,
    pub timestamp: DateTime<Utc>,
}

impl DetectionSample {
    pub fn new(subject_id: impl Into<String>, pixel_width: f64) -> Self {
        Self {
            subject_id: subject_id.into(),
            pixel_width,
            position: None,
            timestamp: Utc::now(),
        }
    }

    pub fn at_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some([x, y]);
        self
    }
}

/// All samples the detector produced for a single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFrame {
    pub samples: Vec<DetectionSample>,
    pub captured_at: DateTime<Utc>,
}

impl DetectionFrame {
    pub fn new(samples: Vec<DetectionSample>) -> Self {
        Self {
            samples,
            captured_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistanceReading {
    pub subject_id: String,
    pub smoothed_cm: f64,
    pub raw_cm: f64,
    pub timestamp: DateTime<Utc>,
}
