use std::io::BufRead;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecognitionError {
    /// Audio was captured but could not be turned into text. Recoverable.
    #[error("speech was unintelligible")]
    Unintelligible,
    /// The recognition backend is unreachable. Ends the voice session.
    #[error("speech recognition unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Speech-to-text backend. `listen` blocks until one utterance has been captured
/// and recognized; there is no latency bound.
pub trait SpeechRecognizer: Send + Sync + 'static {
    fn listen(&self) -> Result<String, RecognitionError>;
}

/// Treats each line typed on stdin as one utterance.
///
/// A blank line counts as unintelligible and end of input as the service going away.
pub struct StdinRecognizer;

impl SpeechRecognizer for StdinRecognizer {
    fn listen(&self) -> Result<String, RecognitionError> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => Err(RecognitionError::ServiceUnavailable("stdin closed".into())),
            Ok(_) => {
                let text = line.trim();
                if text.is_empty() {
                    Err(RecognitionError::Unintelligible)
                } else {
                    Ok(text.to_string())
                }
            }
            Err(err) => Err(RecognitionError::ServiceUnavailable(err.to_string())),
        }
    }
}
