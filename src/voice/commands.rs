use tokio::sync::watch;

use crate::models::{Posture, TelemetryRecord};

/// Receives recognized command text. A returned phrase is spoken back to the user.
///
/// Called off the async runtime, so implementations may block.
pub trait CommandHandler: Send + Sync + 'static {
    fn handle(&self, command: &str) -> Option<String>;
}

const UNAVAILABLE: &str = "unavailable";

/// Answers spoken questions about the latest sensor reading.
pub struct TelemetryQueryHandler {
    latest: watch::Receiver<Option<TelemetryRecord>>,
}

impl TelemetryQueryHandler {
    pub fn new(latest: watch::Receiver<Option<TelemetryRecord>>) -> Self {
        Self { latest }
    }
}

impl CommandHandler for TelemetryQueryHandler {
    fn handle(&self, command: &str) -> Option<String> {
        let command = command.to_lowercase();
        let latest = self.latest.borrow().clone();

        let reply = if command.contains("temperature") {
            let temperature = latest.as_ref().map_or(UNAVAILABLE, |r| r.temperature.as_str());
            format!("Your current temperature is {temperature}")
        } else if command.contains("roll") {
            let roll = latest.as_ref().map_or(UNAVAILABLE, |r| r.roll.as_str());
            format!("The current roll is {roll}")
        } else if command.contains("posture") {
            let posture = match latest.as_ref().map(|r| r.posture) {
                Some(Posture::Good) => "good",
                Some(Posture::Bad) => "bad",
                Some(Posture::Unknown) | None => UNAVAILABLE,
            };
            format!("Your posture is {posture}")
        } else {
            "Sorry, I didn't understand that.".to_string()
        };

        Some(reply)
    }
}
