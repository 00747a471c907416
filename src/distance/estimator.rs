use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use thiserror::Error;

use crate::models::{DetectionSample, DistanceReading};
use crate::settings::DistanceSettings;

/// Why a sample produced no distance. The caller skips the sample.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NoEstimate {
    #[error("pixel width {0} is not a positive number")]
    NonPositiveWidth(f64),
    #[error("no reference width configured for '{0}'")]
    UnknownSubject(String),
    #[error(
        "reference width {reference_width_cm} cm / focal length {focal_length_px} px is not usable"
    )]
    InvalidCalibration {
        reference_width_cm: f64,
        focal_length_px: f64,
    },
}

/// Pinhole-camera distance: `reference_width * focal_length / pixel_width`.
pub fn estimate_distance(
    pixel_width: f64,
    reference_width_cm: f64,
    focal_length_px: f64,
) -> Result<f64, NoEstimate> {
    if !(pixel_width.is_finite() && pixel_width > 0.0) {
        return Err(NoEstimate::NonPositiveWidth(pixel_width));
    }
    let calibrated = reference_width_cm.is_finite()
        && reference_width_cm > 0.0
        && focal_length_px.is_finite()
        && focal_length_px > 0.0;
    if !calibrated {
        return Err(NoEstimate::InvalidCalibration {
            reference_width_cm,
            focal_length_px,
        });
    }

    Ok(reference_width_cm * focal_length_px / pixel_width)
}

/// FIFO of the most recent raw readings for one subject.
#[derive(Debug)]
struct SmoothingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SmoothingWindow {
    fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, value: f64) -> f64 {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Converts bounding-box widths to distances and keeps one moving average per subject.
///
/// The outer map lock is held only long enough to find a subject's window;
/// each window has its own lock, so smoothing for "face" never waits on "bottle"
/// while two calls for the same subject are serialized.
pub struct DistanceEstimator {
    window_size: usize,
    focal_length_px: f64,
    reference_widths_cm: BTreeMap<String, f64>,
    windows: Mutex<HashMap<String, Arc<Mutex<SmoothingWindow>>>>,
}

impl DistanceEstimator {
    pub fn new(settings: &DistanceSettings) -> Self {
        Self {
            window_size: settings.window_size.max(1),
            focal_length_px: settings.focal_length_px,
            reference_widths_cm: settings.reference_widths_cm.clone(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Raw distance for `subject_id` using its configured reference width.
    pub fn estimate(&self, subject_id: &str, pixel_width: f64) -> Result<f64, NoEstimate> {
        let reference_width_cm = self
            .reference_widths_cm
            .get(subject_id)
            .copied()
            .ok_or_else(|| NoEstimate::UnknownSubject(subject_id.to_string()))?;
        estimate_distance(pixel_width, reference_width_cm, self.focal_length_px)
    }

    /// Push `raw_cm` into the subject's window and return the window mean.
    pub fn smooth(&self, subject_id: &str, raw_cm: f64) -> f64 {
        let window = {
            let mut windows = lock(&self.windows);
            windows
                .entry(subject_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(SmoothingWindow::new(self.window_size))))
                .clone()
        };
        let mut window = lock(&window);
        window.push(raw_cm)
    }

    pub fn observe(&self, sample: &DetectionSample) -> Result<DistanceReading, NoEstimate> {
        let raw_cm = self.estimate(&sample.subject_id, sample.pixel_width)?;
        let smoothed_cm = self.smooth(&sample.subject_id, raw_cm);

        Ok(DistanceReading {
            subject_id: sample.subject_id.clone(),
            smoothed_cm,
            raw_cm,
            timestamp: sample.timestamp,
        })
    }

    /// Forget the history for one subject, e.g. after it left the frame.
    pub fn reset(&self, subject_id: &str) {
        lock(&self.windows).remove(subject_id);
    }
}
