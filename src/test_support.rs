//! Scripted collaborators shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex},
};

use crate::announce::{SpeechError, SpeechSink};
use crate::voice::{CommandHandler, RecognitionError, SpeechRecognizer};

#[derive(Clone, Default)]
pub struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
    fail_on: Option<String>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(phrase: &str) -> Self {
        Self {
            spoken: Arc::default(),
            fail_on: Some(phrase.to_string()),
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechSink for RecordingSpeaker {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        if self.fail_on.as_deref() == Some(text) {
            return Err(SpeechError::ServiceUnavailable("engine offline".into()));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Sink that blocks every `speak` until `open` is called.
#[derive(Clone, Default)]
pub struct GatedSpeaker {
    gate: Arc<(Mutex<bool>, Condvar)>,
    spoken: Arc<Mutex<Vec<String>>>,
}

impl GatedSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let (lock, cvar) = &*self.gate;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechSink for GatedSpeaker {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        let (lock, cvar) = &*self.gate;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
        drop(open);
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Recognizer that replays a fixed script, then reports the service as gone.
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Result<String, RecognitionError>>>,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<Result<&str, RecognitionError>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|step| step.map(str::to_string))
                    .collect(),
            ),
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn listen(&self) -> Result<String, RecognitionError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RecognitionError::ServiceUnavailable("script exhausted".into())))
    }
}

/// Command handler that records what it was given and echoes it back.
#[derive(Clone, Default)]
pub struct EchoHandler {
    pub received: Arc<Mutex<Vec<String>>>,
}

impl CommandHandler for EchoHandler {
    fn handle(&self, command: &str) -> Option<String> {
        self.received.lock().unwrap().push(command.to_string());
        Some(format!("You said: {command}"))
    }
}
