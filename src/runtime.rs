use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};
use tokio::sync::mpsc;

use crate::announce::{AnnouncementMediator, SpeechSink};
use crate::db::Database;
use crate::detection::{DetectionController, DetectionPipeline};
use crate::metrics::MetricsCollector;
use crate::models::DetectionFrame;
use crate::settings::RuntimeSettings;
use crate::status::{ComponentStatus, StatusBoard};
use crate::telemetry::{LatestTelemetry, TelemetryController, TelemetrySource};
use crate::voice::{
    CommandHandler, SpeechRecognizer, TelemetryQueryHandler, VoiceController, VoiceInteraction,
    VoiceSession,
};

/// Frames the detector may queue before `send` waits.
const DETECTION_FEED_CAPACITY: usize = 16;

/// External engines the runtime drives but does not implement.
pub struct Collaborators {
    pub speech: Box<dyn SpeechSink>,
    /// `None` leaves voice interaction disabled.
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
    /// `None` answers with the built-in telemetry query handler.
    pub command_handler: Option<Arc<dyn CommandHandler>>,
}

/// All running components. Paths in `settings` must already be resolved.
pub struct Runtime {
    db: Database,
    mediator: AnnouncementMediator,
    metrics: MetricsCollector,
    status: StatusBoard,
    detection_tx: mpsc::Sender<DetectionFrame>,
    detection: DetectionController,
    telemetry: TelemetryController,
    voice: VoiceController,
}

impl Runtime {
    pub async fn start(
        settings: RuntimeSettings,
        db: Database,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let metrics = MetricsCollector::new();
        let status = StatusBoard::new();

        let mediator = AnnouncementMediator::new(
            collaborators.speech,
            settings.announcements.cooldown(),
            settings.announcements.queue_capacity,
            Some(db.clone()),
            metrics.clone(),
        )?;

        let (detection_tx, detection_rx) = mpsc::channel(DETECTION_FEED_CAPACITY);
        let mut detection = DetectionController::new();
        detection.start(
            detection_rx,
            DetectionPipeline::new(&settings.distance, mediator.clone(), metrics.clone()),
        )?;

        let mut telemetry = TelemetryController::new(status.clone());
        if settings.telemetry.enabled {
            let source = TelemetrySource {
                device_path: settings.telemetry.device_path.clone(),
                log_path: settings.telemetry.log_path.clone(),
                poll_interval: settings.telemetry.poll_interval(),
            };
            telemetry
                .start(&source, mediator.clone(), metrics.clone())
                .await?;
        } else {
            telemetry.disable("telemetry disabled in settings");
        }

        let mut voice = VoiceController::new(status.clone());
        match (settings.voice.enabled, collaborators.recognizer) {
            (true, Some(recognizer)) => {
                let handler = collaborators.command_handler.unwrap_or_else(
                    || -> Arc<dyn CommandHandler> {
                        Arc::new(TelemetryQueryHandler::new(telemetry.latest()))
                    },
                );
                let session = voice.session();
                voice
                    .start(VoiceInteraction {
                        session,
                        recognizer,
                        handler: Some(handler),
                        mediator: mediator.clone(),
                        settings: settings.voice.clone(),
                        metrics: metrics.clone(),
                    })
                    .await?;
            }
            (false, _) => {
                status.report_voice(ComponentStatus::Disabled("voice disabled in settings".into()));
            }
            (true, None) => {
                status.report_voice(ComponentStatus::Disabled(
                    "no speech recognizer attached".into(),
                ));
            }
        }

        info!("Runtime started (database at {})", db.path().display());

        Ok(Self {
            db,
            mediator,
            metrics,
            status,
            detection_tx,
            detection,
            telemetry,
            voice,
        })
    }

    /// Sender for the camera/detector collaborator.
    pub fn detection_feed(&self) -> mpsc::Sender<DetectionFrame> {
        self.detection_tx.clone()
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn mediator(&self) -> &AnnouncementMediator {
        &self.mediator
    }

    pub fn latest_telemetry(&self) -> LatestTelemetry {
        self.telemetry.latest()
    }

    pub async fn voice_session(&self) -> VoiceSession {
        self.voice.snapshot().await
    }

    /// Stop every loop, then speak whatever is still queued.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Runtime shutting down");

        if let Err(err) = self.detection.stop().await {
            error!("Failed to stop detection: {err:?}");
        }
        if let Err(err) = self.telemetry.stop().await {
            error!("Failed to stop telemetry: {err:?}");
        }
        if let Err(err) = self.voice.stop().await {
            error!("Failed to stop voice: {err:?}");
        }

        let mediator = self.mediator.clone();
        tokio::task::spawn_blocking(move || mediator.close())
            .await
            .context("speech drain task failed to join")?;

        info!("Runtime stopped");
        Ok(())
    }
}
