use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{error, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::status::{ComponentStatus, StatusBoard};

use super::loop_worker::{voice_loop, VoiceInteraction};
use super::state::VoiceSession;

pub struct VoiceController {
    session: Arc<Mutex<VoiceSession>>,
    status: StatusBoard,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl VoiceController {
    pub fn new(status: StatusBoard) -> Self {
        Self {
            session: Arc::new(Mutex::new(VoiceSession::new())),
            status,
            handle: None,
            cancel_token: None,
        }
    }

    /// Shared session handle; pass it as `VoiceInteraction::session`.
    pub fn session(&self) -> Arc<Mutex<VoiceSession>> {
        Arc::clone(&self.session)
    }

    pub async fn start(&mut self, interaction: VoiceInteraction) -> Result<()> {
        if self.handle.is_some() {
            bail!("voice session already active");
        }
        if !Arc::ptr_eq(&interaction.session, &self.session) {
            bail!("voice interaction is bound to a different session");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let status = self.status.clone();

        status.report_voice(ComponentStatus::Running);
        let handle = tokio::spawn(async move {
            match voice_loop(interaction, token_clone).await {
                Ok(()) => status.report_voice(ComponentStatus::Stopped),
                Err(err) => {
                    error!("Voice loop stopped: {err}");
                    status.report_voice(ComponentStatus::Failed(err.to_string()));
                }
            }
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let joined = if let Some(handle) = self.handle.take() {
            handle.await.context("voice loop task failed to join")
        } else {
            Ok(())
        };

        self.session.lock().await.stop();
        info!("Voice session stopped");
        joined
    }

    pub async fn snapshot(&self) -> VoiceSession {
        self.session.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::AnnouncementMediator;
    use crate::metrics::MetricsCollector;
    use crate::models::VoiceState;
    use crate::settings::VoiceSettings;
    use crate::test_support::{RecordingSpeaker, ScriptedRecognizer};
    use crate::voice::RecognitionError;
    use std::time::Duration;

    fn interaction_for(
        controller: &VoiceController,
        recognizer: ScriptedRecognizer,
    ) -> VoiceInteraction {
        let metrics = MetricsCollector::new();
        VoiceInteraction {
            session: controller.session(),
            recognizer: Arc::new(recognizer),
            handler: None,
            mediator: AnnouncementMediator::new(
                Box::new(RecordingSpeaker::new()),
                Duration::from_secs(3),
                8,
                None,
                metrics.clone(),
            )
            .unwrap(),
            settings: VoiceSettings::default(),
            metrics,
        }
    }

    #[tokio::test]
    async fn recognizer_outage_marks_voice_failed() {
        let status = StatusBoard::new();
        let mut controller = VoiceController::new(status.clone());
        let interaction = interaction_for(
            &controller,
            ScriptedRecognizer::new(vec![Err(RecognitionError::ServiceUnavailable(
                "no microphone".into(),
            ))]),
        );

        let mut rx = status.subscribe();
        controller.start(interaction).await.unwrap();
        rx.wait_for(|s| matches!(s.voice, ComponentStatus::Failed(_)))
            .await
            .unwrap();

        assert_eq!(
            status.current().voice,
            ComponentStatus::Failed("speech recognition unavailable: no microphone".into())
        );
        let session = controller.snapshot().await;
        assert_eq!(session.state, VoiceState::Idle);
        assert_eq!(session.fault.as_deref(), Some("no microphone"));

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let mut controller = VoiceController::new(StatusBoard::new());
        let first = interaction_for(&controller, ScriptedRecognizer::new(vec![]));
        let second = interaction_for(&controller, ScriptedRecognizer::new(vec![]));

        controller.start(first).await.unwrap();
        let err = controller.start(second).await.unwrap_err();
        assert!(err.to_string().contains("already active"));

        controller.stop().await.unwrap();
        assert_eq!(controller.snapshot().await.state, VoiceState::Idle);
    }

    #[tokio::test]
    async fn foreign_session_is_rejected() {
        let mut controller = VoiceController::new(StatusBoard::new());
        let other = VoiceController::new(StatusBoard::new());
        let interaction = interaction_for(&other, ScriptedRecognizer::new(vec![]));

        assert!(controller.start(interaction).await.is_err());
    }
}
