//! Orchestrator driving one end-to-end voice interaction
//!
//! Owns the session cell and the single long-lived task scope. Each
//! `start_voice_command` schedules work onto that scope; at most one
//! interaction is in flight at a time, and starting while busy is a
//! cancellation request, not a queued second run. Continuations that
//! resume after a cancellation detect the state mismatch through the
//! session machine's guarded transitions and discard their results.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capture::{CaptureEvent, SpeechCapture, Transcript};
use crate::config::VoiceConfig;
use crate::context::{DeviceDirectory, PhoneContext};
use crate::dispatch::tree::UiTree;
use crate::dispatch::{ActionDispatcher, ActionResult, AppLauncher, DeviceGateway, SystemActions};
use crate::feedback::{FeedbackCoordinator, Haptics, OverlayCell, SpeechSynthesizer};
use crate::nlu::{CloudResolver, IntentResolver, ResolverRouter};
use crate::secrets::{MemorySecretStore, SecretStore};
use crate::session::{SessionCell, SessionState};
use crate::{MutterError, Result};

/// The voice-command pipeline.
///
/// Cheap to clone; clones share the same session, scope and collaborators.
#[derive(Clone)]
pub struct VoicePipeline {
    config: VoiceConfig,
    session: SessionCell,
    feedback: Arc<FeedbackCoordinator>,
    capture: Arc<dyn SpeechCapture>,
    router: Arc<dyn IntentResolver>,
    dispatcher: Arc<ActionDispatcher>,
    directory: Arc<dyn DeviceDirectory>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for VoicePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePipeline").finish_non_exhaustive()
    }
}

impl VoicePipeline {
    pub fn builder() -> VoicePipelineBuilder {
        VoicePipelineBuilder::new()
    }

    /// The session cell observed by the presentation layer
    pub fn session(&self) -> &SessionCell {
        &self.session
    }

    /// The overlay cell observed by the presentation layer
    pub fn overlay(&self) -> &OverlayCell {
        self.feedback.overlay()
    }

    /// Begin one voice interaction.
    ///
    /// If a previous interaction has not reached `Idle` yet this acts as a
    /// stop button: the in-flight interaction is cancelled and no new one
    /// starts. If capture is unavailable an error is surfaced immediately
    /// and the session stays `Idle`.
    pub fn start_voice_command(&self) {
        if self.session.state() != SessionState::Idle {
            debug!(state = %self.session.state(), "voice command while busy, cancelling");
            self.cancel();
            return;
        }

        if !self.capture.is_available() {
            warn!("speech capture not available");
            self.feedback.on_error("Speech recognition not available");
            self.schedule_dismiss(self.config.error_dismiss_ms);
            return;
        }

        self.session.start_session();
        self.feedback.on_listening_started();

        let run_id = Uuid::new_v4();
        info!(%run_id, locale = %self.config.locale, "voice interaction started");

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        self.capture.start_listening(&self.config.locale, events_tx);

        let pipeline = self.clone();
        let shutdown = self.shutdown.clone();
        self.tasks.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events_rx.recv() => match event {
                        Some(CaptureEvent::Partial(text)) => {
                            pipeline.feedback.on_partial_transcript(&text);
                        }
                        Some(CaptureEvent::Final(transcript)) => {
                            pipeline.process_transcript(run_id, transcript).await;
                            break;
                        }
                        Some(CaptureEvent::Error(err)) => {
                            warn!(%run_id, error = ?err, "capture failed");
                            pipeline.session.transition_to_error();
                            pipeline.feedback.on_error(err.user_message());
                            pipeline.schedule_dismiss(pipeline.config.error_dismiss_ms);
                            break;
                        }
                        None => {
                            debug!(%run_id, "capture channel closed without a final result");
                            break;
                        }
                    }
                }
            }
        });
    }

    async fn process_transcript(&self, run_id: Uuid, transcript: Transcript) {
        if !self.session.transition_to_processing() {
            debug!(%run_id, "stale final transcript discarded");
            return;
        }
        debug!(%run_id, confidence = transcript.confidence, "final transcript received");
        self.feedback.on_processing(&transcript.text);

        match self.run_stages(run_id, &transcript).await {
            Ok(Some(result)) => {
                let delay_ms = match result {
                    ActionResult::Success => self.config.success_dismiss_ms,
                    _ => self.config.error_dismiss_ms,
                };
                self.schedule_dismiss(delay_ms);
            }
            Ok(None) => {
                debug!(%run_id, "interaction cancelled mid-flight, result discarded");
            }
            Err(e) => {
                error!(%run_id, error = %e, "voice pipeline failed");
                self.session.transition_to_error();
                self.feedback.on_error(&e.user_message());
                self.schedule_dismiss(self.config.error_dismiss_ms);
            }
        }
    }

    /// Resolution and dispatch. `Ok(None)` means the session left the
    /// expected state underneath us (cancellation) and the result was
    /// discarded.
    async fn run_stages(
        &self,
        run_id: Uuid,
        transcript: &Transcript,
    ) -> Result<Option<ActionResult>> {
        let context = PhoneContext::snapshot(self.directory.as_ref())?;

        if !self.session.transition_to_executing() {
            return Ok(None);
        }

        let action = self.router.resolve_intent(&transcript.text, &context).await;
        debug!(%run_id, kind = action.kind(), "intent resolved");

        let result = self.dispatcher.execute(&action).await;

        if !self.session.transition_to_feedback() {
            return Ok(None);
        }
        self.feedback.on_action_result(&result);
        Ok(Some(result))
    }

    fn schedule_dismiss(&self, delay_ms: u64) {
        let session = self.session.clone();
        let feedback = self.feedback.clone();
        let shutdown = self.shutdown.clone();
        self.tasks.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
                    session.transition_to_idle();
                    feedback.dismiss();
                }
            }
        });
    }

    /// Hard preemption: stop capture, reset the session, hide the overlay.
    /// Callable from any state.
    pub fn cancel(&self) {
        self.capture.stop_listening();
        self.session.cancel_session();
        self.feedback.dismiss();
    }

    /// Cancel plus release of capture and feedback resources and
    /// cancellation of the owning task scope. Idempotent.
    pub fn destroy(&self) {
        self.cancel();
        self.capture.shutdown();
        self.feedback.destroy();
        self.shutdown.cancel();
        self.tasks.close();
    }
}

/// Builder wiring the pipeline's collaborators together.
///
/// Capture, directory, launcher, system actions, gateway and UI tree are
/// required; speech synthesis, haptics and the secret store are optional.
pub struct VoicePipelineBuilder {
    config: VoiceConfig,
    capture: Option<Arc<dyn SpeechCapture>>,
    directory: Option<Arc<dyn DeviceDirectory>>,
    launcher: Option<Arc<dyn AppLauncher>>,
    system: Option<Arc<dyn SystemActions>>,
    gateway: Option<Arc<dyn DeviceGateway>>,
    ui_tree: Option<Arc<dyn UiTree>>,
    secrets: Option<Arc<dyn SecretStore>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    haptics: Option<Arc<dyn Haptics>>,
    remote: Option<Arc<dyn IntentResolver>>,
}

impl Default for VoicePipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VoicePipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: VoiceConfig::default(),
            capture: None,
            directory: None,
            launcher: None,
            system: None,
            gateway: None,
            ui_tree: None,
            secrets: None,
            synthesizer: None,
            haptics: None,
            remote: None,
        }
    }

    pub fn with_config(mut self, config: VoiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_capture(mut self, capture: Arc<dyn SpeechCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn DeviceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn AppLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_system_actions(mut self, system: Arc<dyn SystemActions>) -> Self {
        self.system = Some(system);
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn DeviceGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_ui_tree(mut self, ui_tree: Arc<dyn UiTree>) -> Self {
        self.ui_tree = Some(ui_tree);
        self
    }

    pub fn with_secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_haptics(mut self, haptics: Arc<dyn Haptics>) -> Self {
        self.haptics = Some(haptics);
        self
    }

    /// Replace the remote resolution strategy (tests, alternate endpoints)
    pub fn with_remote_resolver(mut self, remote: Arc<dyn IntentResolver>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn build(self) -> Result<VoicePipeline> {
        let capture = self
            .capture
            .ok_or_else(|| MutterError::ConfigError("speech capture is required".into()))?;
        let directory = self
            .directory
            .ok_or_else(|| MutterError::ConfigError("device directory is required".into()))?;
        let launcher = self
            .launcher
            .ok_or_else(|| MutterError::ConfigError("app launcher is required".into()))?;
        let system = self
            .system
            .ok_or_else(|| MutterError::ConfigError("system actions are required".into()))?;
        let gateway = self
            .gateway
            .ok_or_else(|| MutterError::ConfigError("device gateway is required".into()))?;
        let ui_tree = self
            .ui_tree
            .ok_or_else(|| MutterError::ConfigError("UI tree is required".into()))?;

        let secrets = self
            .secrets
            .unwrap_or_else(|| Arc::new(MemorySecretStore::new()));

        let remote: Arc<dyn IntentResolver> = match self.remote {
            Some(remote) => remote,
            None => Arc::new(CloudResolver::new(self.config.clone(), secrets)?),
        };

        let router = Arc::new(ResolverRouter::new(&self.config, remote));
        let dispatcher = Arc::new(ActionDispatcher::new(
            directory.clone(),
            launcher,
            system,
            gateway,
            ui_tree,
            Duration::from_millis(self.config.compound_delay_ms),
        ));
        let feedback = Arc::new(FeedbackCoordinator::new(
            &self.config,
            self.synthesizer,
            self.haptics,
        ));

        Ok(VoicePipeline {
            config: self.config,
            session: SessionCell::new(),
            feedback,
            capture,
            router,
            dispatcher,
            directory,
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_collaborators() {
        let err = VoicePipeline::builder().build().unwrap_err();
        assert!(matches!(err, MutterError::ConfigError(_)));
    }
}
