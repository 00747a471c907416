use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeechError {
    #[error("speech synthesis unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Text-to-speech backend. `speak` blocks until playback finishes.
///
/// The sink is moved onto the mediator's delivery thread, so it only has to be
/// `Send`; engines that are not thread-safe work as long as they stay there.
pub trait SpeechSink: Send + 'static {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError>;
}

/// Speech sink that writes phrases to the log; used when no synthesis engine is attached.
pub struct LogSpeaker;

impl SpeechSink for LogSpeaker {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        log::info!("[speech] {text}");
        Ok(())
    }
}
