pub mod commands;
pub mod controller;
pub mod loop_worker;
pub mod recognizer;
pub mod state;

pub use commands::{CommandHandler, TelemetryQueryHandler};
pub use controller::VoiceController;
pub use loop_worker::{VoiceError, VoiceInteraction};
pub use recognizer::{RecognitionError, SpeechRecognizer, StdinRecognizer};
pub use state::{VoiceSession, WakeOutcome};
