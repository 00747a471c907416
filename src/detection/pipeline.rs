use std::collections::HashSet;

use crate::announce::AnnouncementMediator;
use crate::distance::{DistanceEstimator, ProximityTracker};
use crate::metrics::{Counter, MetricsCollector};
use crate::models::{AnnouncementRequest, DetectionFrame, DistanceReading};
use crate::settings::DistanceSettings;

const ENABLE_LOGS: bool = false;

use crate::log_debug;

pub const APPROACH_PHRASE: &str = "Someone is approaching you!";
pub const NO_PERSON_PHRASE: &str = "No person seen";
const PRESENCE_SUBJECT: &str = "presence";
const PERSON_CLASSES: [&str; 2] = ["face", "person"];

/// Says "No person seen" once per absence instead of on every empty frame.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    absence_announced: bool,
}

impl PresenceTracker {
    /// Returns true when the absence should be announced.
    pub fn observe(&mut self, person_in_frame: bool) -> bool {
        if person_in_frame {
            self.absence_announced = false;
            return false;
        }
        !std::mem::replace(&mut self.absence_announced, true)
    }
}

pub fn distance_phrase(reading: &DistanceReading) -> String {
    format!("{} at {:.0} centimeters", reading.subject_id, reading.smoothed_cm)
}

/// Detector output to spoken distance, approach and presence announcements.
pub struct DetectionPipeline {
    estimator: DistanceEstimator,
    proximity: ProximityTracker,
    presence: PresenceTracker,
    in_frame: HashSet<String>,
    mediator: AnnouncementMediator,
    metrics: MetricsCollector,
}

impl DetectionPipeline {
    pub fn new(
        settings: &DistanceSettings,
        mediator: AnnouncementMediator,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            estimator: DistanceEstimator::new(settings),
            proximity: ProximityTracker::new(settings),
            presence: PresenceTracker::default(),
            in_frame: HashSet::new(),
            mediator,
            metrics,
        }
    }

    /// Handle one frame and return the readings that could be estimated.
    pub fn process(&mut self, frame: &DetectionFrame) -> Vec<DistanceReading> {
        let mut readings = Vec::with_capacity(frame.samples.len());

        for sample in &frame.samples {
            self.metrics.incr(Counter::SamplesProcessed);

            let reading = match self.estimator.observe(sample) {
                Ok(reading) => reading,
                Err(err) => {
                    self.metrics.incr(Counter::NoEstimate);
                    log_debug!("Skipped sample for {}: {err}", sample.subject_id);
                    continue;
                }
            };

            self.mediator.offer_now(&AnnouncementRequest::info(
                reading.subject_id.clone(),
                distance_phrase(&reading),
            ));

            if let Some(position) = sample.position {
                if self
                    .proximity
                    .observe(&reading.subject_id, position, reading.smoothed_cm)
                {
                    self.mediator.offer_now(&AnnouncementRequest::alert(
                        format!("{}:approach", reading.subject_id),
                        APPROACH_PHRASE,
                    ));
                }
            }

            readings.push(reading);
        }

        // A subject that left the frame starts over on its next sighting.
        let in_frame: HashSet<String> = frame
            .samples
            .iter()
            .map(|sample| sample.subject_id.clone())
            .collect();
        for gone in self.in_frame.difference(&in_frame) {
            log_debug!("{gone} left the frame");
            self.proximity.forget(gone);
        }
        self.in_frame = in_frame;

        let person_in_frame = frame
            .samples
            .iter()
            .any(|sample| PERSON_CLASSES.contains(&sample.subject_id.as_str()));
        if self.presence.observe(person_in_frame) {
            self.mediator
                .offer_now(&AnnouncementRequest::info(PRESENCE_SUBJECT, NO_PERSON_PHRASE));
        }

        readings
    }
}
