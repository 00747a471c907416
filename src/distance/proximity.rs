use std::collections::HashMap;

use crate::settings::DistanceSettings;

/// Flags subjects that are both close and moving in the frame.
///
/// Movement is measured between consecutive positions of the same subject on
/// either axis of the bounding-box corner.
pub struct ProximityTracker {
    proximity_cm: f64,
    movement_threshold_px: f64,
    last_positions: HashMap<String, [f64; 2]>,
}

impl ProximityTracker {
    pub fn new(settings: &DistanceSettings) -> Self {
        Self {
            proximity_cm: settings.proximity_cm,
            movement_threshold_px: settings.movement_threshold_px,
            last_positions: HashMap::new(),
        }
    }

    /// Record `position` for `subject_id` and report whether it is approaching.
    pub fn observe(&mut self, subject_id: &str, position: [f64; 2], smoothed_cm: f64) -> bool {
        let previous = self.last_positions.insert(subject_id.to_string(), position);

        if smoothed_cm > self.proximity_cm {
            return false;
        }

        match previous {
            Some([x, y]) => {
                let dx = (position[0] - x).abs();
                let dy = (position[1] - y).abs();
                dx > self.movement_threshold_px || dy > self.movement_threshold_px
            }
            None => false,
        }
    }

    pub fn forget(&mut self, subject_id: &str) {
        self.last_positions.remove(subject_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ProximityTracker {
        ProximityTracker::new(&DistanceSettings::default())
    }

    #[test]
    fn first_sighting_is_never_approaching() {
        let mut tracker = tracker();
        assert!(!tracker.observe("face", [100.0, 100.0], 15.0));
    }

    #[test]
    fn close_and_moving_is_approaching() {
        let mut tracker = tracker();
        tracker.observe("face", [100.0, 100.0], 15.0);
        assert!(tracker.observe("face", [100.0, 120.0], 15.0));
    }

    #[test]
    fn close_but_still_is_not_approaching() {
        let mut tracker = tracker();
        tracker.observe("face", [100.0, 100.0], 15.0);
        assert!(!tracker.observe("face", [105.0, 104.0], 15.0));
    }

    #[test]
    fn far_and_moving_is_not_approaching() {
        let mut tracker = tracker();
        tracker.observe("face", [100.0, 100.0], 80.0);
        assert!(!tracker.observe("face", [300.0, 100.0], 80.0));
    }

    #[test]
    fn forget_drops_previous_position() {
        let mut tracker = tracker();
        tracker.observe("face", [100.0, 100.0], 15.0);
        tracker.forget("face");
        assert!(!tracker.observe("face", [300.0, 100.0], 15.0));
    }
}
