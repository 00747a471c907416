use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::announce::AnnouncementMediator;
use crate::metrics::{Counter, MetricsCollector};
use crate::models::{AnnouncementRequest, VoiceState};
use crate::settings::VoiceSettings;

use super::commands::CommandHandler;
use super::recognizer::{RecognitionError, SpeechRecognizer};
use super::state::{VoiceSession, WakeOutcome};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("speech recognition unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Everything one pass of the wake-word / command cycle needs.
#[derive(Clone)]
pub struct VoiceInteraction {
    pub session: Arc<Mutex<VoiceSession>>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub handler: Option<Arc<dyn CommandHandler>>,
    pub mediator: AnnouncementMediator,
    pub settings: VoiceSettings,
    pub metrics: MetricsCollector,
}

impl VoiceInteraction {
    async fn listen(&self) -> Result<String, RecognitionError> {
        let recognizer = Arc::clone(&self.recognizer);
        match tokio::task::spawn_blocking(move || recognizer.listen()).await {
            Ok(result) => result,
            Err(join_err) => Err(RecognitionError::ServiceUnavailable(format!(
                "recognizer worker failed: {join_err}"
            ))),
        }
    }

    async fn dispatch(&self, command: String) -> Option<String> {
        let handler = Arc::clone(self.handler.as_ref()?);
        match tokio::task::spawn_blocking(move || handler.handle(&command)).await {
            Ok(reply) => reply,
            Err(join_err) => {
                log_error!("command handler failed: {join_err}");
                None
            }
        }
    }

    async fn fail(&self, reason: String) -> VoiceError {
        log_error!("voice session halted: {reason}");
        self.session.lock().await.halt(&reason);
        VoiceError::ServiceUnavailable(reason)
    }

    /// Run one blocking recognition for the current state and apply the result.
    /// Returns the state the session ends up in.
    pub async fn step(&self) -> Result<VoiceState, VoiceError> {
        let state = self.session.lock().await.state;

        match state {
            VoiceState::Idle => Ok(VoiceState::Idle),
            VoiceState::AwaitingWakeWord => {
                match self.listen().await {
                    Ok(text) => {
                        let outcome = self
                            .session
                            .lock()
                            .await
                            .hear_wake(&text, &self.settings.wake_phrase);
                        match outcome {
                            WakeOutcome::Activated { activation_id } => {
                                self.metrics.incr(Counter::VoiceActivations);
                                log_info!("wake word detected (activation {activation_id})");
                                self.mediator.offer_now(&AnnouncementRequest::alert(
                                    format!("voice:{activation_id}:ack"),
                                    self.settings.ack_phrase.clone(),
                                ));
                            }
                            WakeOutcome::Ignored => {
                                log_debug!("wake word ignored, session already active");
                            }
                            WakeOutcome::NotWakeWord => log_debug!("heard: {text}"),
                        }
                    }
                    Err(RecognitionError::Unintelligible) => {
                        self.metrics.incr(Counter::VoiceUnintelligible);
                    }
                    Err(RecognitionError::ServiceUnavailable(reason)) => {
                        return Err(self.fail(reason).await);
                    }
                }
                Ok(self.session.lock().await.state)
            }
            VoiceState::CapturingCommand => {
                match self.listen().await {
                    Ok(command) => {
                        let activation_id = {
                            let mut session = self.session.lock().await;
                            session.command_captured(&command);
                            session.activation_id.clone().unwrap_or_default()
                        };
                        log_info!("command recognized: {command}");

                        if let Some(reply) = self.dispatch(command).await {
                            self.mediator.offer_now(&AnnouncementRequest::info(
                                format!("voice:{activation_id}:reply"),
                                reply,
                            ));
                        }
                        self.session.lock().await.finish_response();
                    }
                    Err(RecognitionError::Unintelligible) => {
                        self.metrics.incr(Counter::VoiceUnintelligible);
                        log_warn!("command not understood; back to wake word");
                        let mut session = self.session.lock().await;
                        let activation_id = session.activation_id.clone().unwrap_or_default();
                        session.command_missed();
                        drop(session);
                        self.mediator.offer_now(&AnnouncementRequest::alert(
                            format!("voice:{activation_id}:retry"),
                            self.settings.retry_prompt.clone(),
                        ));
                    }
                    Err(RecognitionError::ServiceUnavailable(reason)) => {
                        return Err(self.fail(reason).await);
                    }
                }
                Ok(self.session.lock().await.state)
            }
            VoiceState::Responding => {
                // Only reachable if a previous step was cancelled mid-response.
                self.session.lock().await.finish_response();
                Ok(VoiceState::AwaitingWakeWord)
            }
        }
    }
}

pub async fn voice_loop(
    interaction: VoiceInteraction,
    cancel_token: CancellationToken,
) -> Result<(), VoiceError> {
    interaction.session.lock().await.start();
    log_info!(
        "voice loop listening for wake phrase '{}'",
        interaction.settings.wake_phrase
    );

    loop {
        let step = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("voice loop shutting down");
                break;
            }
            step = interaction.step() => step,
        };

        match step {
            Ok(VoiceState::Idle) => break,
            Ok(_) => {}
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
