mod estimator;
mod proximity;

pub use estimator::{estimate_distance, DistanceEstimator, NoEstimate};
pub use proximity::ProximityTracker;
