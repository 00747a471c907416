use serde::Serialize;
use uuid::Uuid;

use crate::models::VoiceState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeOutcome {
    /// The utterance did not contain the wake phrase.
    NotWakeWord,
    /// Wake phrase heard while a session is already active, or before start.
    Ignored,
    Activated { activation_id: String },
}

/// The process-wide voice interaction state.
///
/// Transitions are plain methods returning whether they applied, so the loop
/// can drive them and tests can poke them without a recognizer.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSession {
    pub state: VoiceState,
    /// Set from wake-word activation until the response is finished.
    pub active: bool,
    pub activation_id: Option<String>,
    pub last_command: Option<String>,
    /// Why the session halted, if it did.
    pub fault: Option<String>,
}

impl VoiceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> AwaitingWakeWord. Also clears a previous fault.
    pub fn start(&mut self) -> bool {
        if self.state != VoiceState::Idle {
            return false;
        }
        *self = Self {
            state: VoiceState::AwaitingWakeWord,
            ..Self::default()
        };
        true
    }

    /// Case-insensitive substring match against `wake_phrase`.
    pub fn hear_wake(&mut self, text: &str, wake_phrase: &str) -> WakeOutcome {
        let wake_phrase = wake_phrase.trim().to_lowercase();
        if wake_phrase.is_empty() || !text.to_lowercase().contains(&wake_phrase) {
            return WakeOutcome::NotWakeWord;
        }

        if self.active || self.state != VoiceState::AwaitingWakeWord {
            return WakeOutcome::Ignored;
        }

        let activation_id = Uuid::new_v4().to_string();
        self.active = true;
        self.state = VoiceState::CapturingCommand;
        self.activation_id = Some(activation_id.clone());
        WakeOutcome::Activated { activation_id }
    }

    /// CapturingCommand -> Responding.
    pub fn command_captured(&mut self, command: &str) -> bool {
        if self.state != VoiceState::CapturingCommand {
            return false;
        }
        self.state = VoiceState::Responding;
        self.last_command = Some(command.to_string());
        true
    }

    /// CapturingCommand -> AwaitingWakeWord; one attempt per activation.
    pub fn command_missed(&mut self) -> bool {
        if self.state != VoiceState::CapturingCommand {
            return false;
        }
        self.release();
        true
    }

    /// Responding -> AwaitingWakeWord.
    pub fn finish_response(&mut self) -> bool {
        if self.state != VoiceState::Responding {
            return false;
        }
        self.release();
        true
    }

    /// Terminal stop after a backend failure.
    pub fn halt(&mut self, reason: &str) {
        self.state = VoiceState::Idle;
        self.active = false;
        self.activation_id = None;
        self.fault = Some(reason.to_string());
    }

    /// Orderly stop on shutdown.
    pub fn stop(&mut self) {
        self.state = VoiceState::Idle;
        self.active = false;
        self.activation_id = None;
    }

    fn release(&mut self) {
        self.state = VoiceState::AwaitingWakeWord;
        self.active = false;
        self.activation_id = None;
    }
}
