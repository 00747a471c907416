use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum VoiceState {
    Idle,
    AwaitingWakeWord,
    CapturingCommand,
    Responding,
}

impl Default for VoiceState {
    fn default() -> Self {
        VoiceState::Idle
    }
}

impl VoiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceState::Idle => "Idle",
            VoiceState::AwaitingWakeWord => "AwaitingWakeWord",
            VoiceState::CapturingCommand => "CapturingCommand",
            VoiceState::Responding => "Responding",
        }
    }
}
