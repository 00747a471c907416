use std::{
    sync::{mpsc, Arc, Mutex},
    time::Duration,
};

use assistwear_lib::{
    announce::{SpeechError, SpeechSink},
    db::Database,
    models::{DetectionFrame, DetectionSample},
    settings::RuntimeSettings,
    status::ComponentStatus,
    telemetry::NO_TELEMETRY,
    voice::{RecognitionError, SpeechRecognizer},
    Collaborators, Runtime,
};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct SharedSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl SharedSpeaker {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    async fn wait_for(&self, phrase: &str) {
        let found = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.spoken().iter().any(|spoken| spoken == phrase) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(found.is_ok(), "never heard '{phrase}', got {:?}", self.spoken());
    }
}

impl SpeechSink for SharedSpeaker {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Recognizer fed by the test; closing the channel takes the service down.
struct ChannelRecognizer {
    utterances: Mutex<mpsc::Receiver<String>>,
}

impl SpeechRecognizer for ChannelRecognizer {
    fn listen(&self) -> Result<String, RecognitionError> {
        self.utterances
            .lock()
            .unwrap()
            .recv()
            .map_err(|_| RecognitionError::ServiceUnavailable("microphone closed".into()))
    }
}

fn settings_in(tmp_dir: &TempDir) -> RuntimeSettings {
    let mut settings = RuntimeSettings::default();
    settings.telemetry.device_path = tmp_dir.path().join("sensor.tty");
    settings.telemetry.log_path = tmp_dir.path().join("sensor_data.csv");
    settings.telemetry.poll_interval_ms = 10;
    settings.storage.database_path = tmp_dir.path().join("detections.sqlite3");
    settings
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn detections_telemetry_and_voice_reach_speech_and_history() {
    let tmp_dir = TempDir::new().unwrap();
    let settings = settings_in(&tmp_dir);
    std::fs::write(
        &settings.telemetry.device_path,
        "Mode: Data Enabled\n\
         Roll: 3°, Temp: 36.5°C, , Posture: Bad, Distance: 50cm, Button: No\n\
         Roll: 5\n",
    )
    .unwrap();

    let db = Database::new(settings.storage.database_path.clone()).unwrap();
    let speaker = SharedSpeaker::default();
    let (utterances, utterance_rx) = mpsc::channel();

    let runtime = Runtime::start(
        settings.clone(),
        db.clone(),
        Collaborators {
            speech: Box::new(speaker.clone()),
            recognizer: Some(Arc::new(ChannelRecognizer {
                utterances: Mutex::new(utterance_rx),
            })),
            command_handler: None,
        },
    )
    .await
    .unwrap();

    let status = runtime.status().current();
    assert_eq!(status.voice, ComponentStatus::Running);
    assert_eq!(status.telemetry, ComponentStatus::Running);

    speaker.wait_for("Maintain posture.").await;
    runtime
        .latest_telemetry()
        .wait_for(|record| record.is_some())
        .await
        .unwrap();

    utterances.send("hello".to_string()).unwrap();
    utterances.send("what is my temperature".to_string()).unwrap();
    speaker
        .wait_for("Wake word detected. Please say your command.")
        .await;
    speaker.wait_for("Your current temperature is 36.5°C").await;

    let feed = runtime.detection_feed();
    feed.send(DetectionFrame::new(vec![DetectionSample::new("face", 105.0)]))
        .await
        .unwrap();
    speaker.wait_for("face at 80 centimeters").await;

    drop(utterances);
    let metrics = runtime.metrics().clone();
    runtime.shutdown().await.unwrap();

    let counts = metrics.counts();
    assert_eq!(counts.telemetry_records, 1);
    assert_eq!(counts.telemetry_parse_errors, 1);
    assert_eq!(counts.voice_activations, 1);
    assert_eq!(counts.alerts_raised, 1);

    let history: Vec<String> = db
        .list_recent_history(None)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.detected_item)
        .collect();
    assert!(history.contains(&"Maintain posture.".to_string()));
    assert!(history.contains(&"face at 80 centimeters".to_string()));
    assert!(history.contains(&"Your current temperature is 36.5°C".to_string()));
    assert_eq!(history.first().map(String::as_str), Some("face at 80 centimeters"));

    let sensor_log = std::fs::read_to_string(&settings.telemetry.log_path).unwrap();
    assert_eq!(sensor_log.lines().count(), 2);
}

#[tokio::test]
async fn runs_without_sensor_or_microphone() {
    let tmp_dir = TempDir::new().unwrap();
    let settings = settings_in(&tmp_dir);
    let db = Database::new(settings.storage.database_path.clone()).unwrap();
    let speaker = SharedSpeaker::default();

    let runtime = Runtime::start(
        settings,
        db.clone(),
        Collaborators {
            speech: Box::new(speaker.clone()),
            recognizer: None,
            command_handler: None,
        },
    )
    .await
    .unwrap();

    let status = runtime.status().current();
    assert_eq!(status.telemetry, ComponentStatus::Disabled(NO_TELEMETRY.into()));
    assert!(matches!(status.voice, ComponentStatus::Disabled(_)));

    runtime
        .detection_feed()
        .send(DetectionFrame::new(vec![]))
        .await
        .unwrap();
    speaker.wait_for("No person seen").await;

    runtime.shutdown().await.unwrap();
    let history = db.list_recent_history(Some(10)).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].detected_item, "No person seen");
}
