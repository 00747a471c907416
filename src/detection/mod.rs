pub mod controller;
pub mod loop_worker;
pub mod pipeline;

pub use controller::DetectionController;
pub use pipeline::{distance_phrase, DetectionPipeline, PresenceTracker};
