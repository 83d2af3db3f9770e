//! Feedback fan-out: overlay state, spoken confirmation, haptic pulses
//!
//! One result goes out over three independent channels. The overlay cell is
//! the only channel the UI layer observes; speech and haptics are
//! best-effort, each gated by its own user preference, and a failure or
//! absence of either capability never blocks the others.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::config::VoiceConfig;
use crate::dispatch::ActionResult;

/// Short tick when listening starts
pub const HAPTIC_TICK: &[u64] = &[0, 30];
/// Two quick pulses on success
pub const HAPTIC_SUCCESS: &[u64] = &[0, 30, 80, 30];
/// Two heavier pulses on error
pub const HAPTIC_ERROR: &[u64] = &[0, 50, 50, 100];

/// Visual state of the voice overlay
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OverlayState {
    #[default]
    Hidden,
    /// Listening, with the latest partial transcript (may be empty)
    Listening { partial: String },
    /// Resolving and dispatching the final transcript
    Processing { transcript: String },
    Success,
    Confirmation { message: String },
    Error { message: String },
}

/// Observable cell holding the current [`OverlayState`]
#[derive(Clone)]
pub struct OverlayCell {
    tx: Arc<watch::Sender<OverlayState>>,
}

impl Default for OverlayCell {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(OverlayState::Hidden);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> OverlayState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OverlayState> {
        self.tx.subscribe()
    }

    fn set(&self, state: OverlayState) {
        self.tx.send_replace(state);
    }
}

/// Fire-and-forget speech synthesis.
///
/// `speak` uses flush semantics: a new utterance replaces any in-flight one.
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str);

    fn stop(&self);
}

/// Fire-and-forget vibration capability
pub trait Haptics: Send + Sync {
    /// Play an off/on millisecond waveform once
    fn vibrate(&self, pattern: &[u64]);
}

pub struct FeedbackCoordinator {
    overlay: OverlayCell,
    synthesizer: Mutex<Option<Arc<dyn SpeechSynthesizer>>>,
    haptics: Option<Arc<dyn Haptics>>,
    tts_enabled: bool,
    haptics_enabled: bool,
}

impl FeedbackCoordinator {
    pub fn new(
        config: &VoiceConfig,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        haptics: Option<Arc<dyn Haptics>>,
    ) -> Self {
        Self {
            overlay: OverlayCell::new(),
            synthesizer: Mutex::new(synthesizer),
            haptics,
            tts_enabled: config.tts_enabled,
            haptics_enabled: config.haptics_enabled,
        }
    }

    /// The cell the presentation layer observes
    pub fn overlay(&self) -> &OverlayCell {
        &self.overlay
    }

    pub fn on_listening_started(&self) {
        self.overlay.set(OverlayState::Listening {
            partial: String::new(),
        });
        self.haptic(HAPTIC_TICK);
    }

    /// Partial transcripts update the overlay only
    pub fn on_partial_transcript(&self, text: &str) {
        self.overlay.set(OverlayState::Listening {
            partial: text.to_string(),
        });
    }

    pub fn on_processing(&self, transcript: &str) {
        self.overlay.set(OverlayState::Processing {
            transcript: transcript.to_string(),
        });
    }

    pub fn on_action_result(&self, result: &ActionResult) {
        match result {
            ActionResult::Success => {
                self.overlay.set(OverlayState::Success);
                self.haptic(HAPTIC_SUCCESS);
            }
            ActionResult::NeedsConfirmation { message } => {
                self.overlay.set(OverlayState::Confirmation {
                    message: message.clone(),
                });
                self.speak(message);
            }
            ActionResult::NeedsPermission { permission } => {
                self.overlay.set(OverlayState::Error {
                    message: format!("Permission needed: {permission}"),
                });
                self.haptic(HAPTIC_ERROR);
            }
            ActionResult::Failed { reason } => {
                self.overlay.set(OverlayState::Error {
                    message: reason.clone(),
                });
                self.haptic(HAPTIC_ERROR);
            }
        }
    }

    pub fn on_error(&self, message: &str) {
        self.overlay.set(OverlayState::Error {
            message: message.to_string(),
        });
        self.haptic(HAPTIC_ERROR);
    }

    pub fn dismiss(&self) {
        self.overlay.set(OverlayState::Hidden);
    }

    /// Hide the overlay and release the speech capability. Safe to call
    /// more than once.
    pub fn destroy(&self) {
        self.overlay.set(OverlayState::Hidden);
        if let Some(synthesizer) = self.synthesizer.lock().take() {
            synthesizer.stop();
            debug!("speech synthesizer released");
        }
    }

    fn speak(&self, text: &str) {
        if !self.tts_enabled {
            return;
        }
        if let Some(synthesizer) = self.synthesizer.lock().as_ref() {
            synthesizer.speak(text);
        }
    }

    fn haptic(&self, pattern: &[u64]) {
        if !self.haptics_enabled {
            return;
        }
        if let Some(haptics) = &self.haptics {
            haptics.vibrate(pattern);
        }
    }
}
