use crate::models::{AnnouncementRequest, Posture, TelemetryRecord};

pub const POSTURE_ALERT_PHRASE: &str = "Maintain posture.";
pub const BUTTON_ALERT_PHRASE: &str = "Help requested. Button pressed.";

/// Last seen values, kept only to detect transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    pub last_posture: Posture,
    pub last_button: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEvent {
    PostureAlert,
    ButtonAlert,
}

impl AlertEvent {
    pub fn to_announcement(self) -> AnnouncementRequest {
        match self {
            AlertEvent::PostureAlert => AnnouncementRequest::alert("posture", POSTURE_ALERT_PHRASE),
            AlertEvent::ButtonAlert => AnnouncementRequest::alert("button", BUTTON_ALERT_PHRASE),
        }
    }
}

/// Alerts fire on the edge into `Bad` / pressed, never while the condition holds.
pub fn update_alerts(record: &TelemetryRecord, state: &mut AlertState) -> Vec<AlertEvent> {
    let mut events = Vec::new();

    if record.posture == Posture::Bad && state.last_posture != Posture::Bad {
        events.push(AlertEvent::PostureAlert);
    }
    events.extend(update_button(record.button, state));

    state.last_posture = record.posture;
    events
}

/// Button-only variant used for `Button Pressed:` notices.
pub fn update_button(pressed: bool, state: &mut AlertState) -> Option<AlertEvent> {
    let event = (pressed && !state.last_button).then_some(AlertEvent::ButtonAlert);
    state.last_button = pressed;
    event
}
