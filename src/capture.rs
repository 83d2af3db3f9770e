//! Speech-capture collaborator contract
//!
//! Capture is callback-driven: the pipeline hands the capability a channel
//! sender and suspends on the receiving end until a final transcript or an
//! error arrives. Partial transcripts may arrive any number of times before
//! either.

use tokio::sync::mpsc::UnboundedSender;

/// A finished utterance transcript with the recognizer's confidence score.
#[derive(Clone, Debug, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Recognizer confidence in `[0.0, 1.0]`
    pub confidence: f32,
}

impl Transcript {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Events produced by a capture capability for one listening attempt
#[derive(Clone, Debug)]
pub enum CaptureEvent {
    /// Ephemeral partial transcript; drives the overlay only
    Partial(String),
    /// Final transcript; exactly one per successful attempt
    Final(Transcript),
    /// Capture failed; exactly one per failed attempt
    Error(CaptureError),
}

/// Failure kinds reported by the capture capability
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureError {
    NoMatch,
    Network,
    Audio,
    PermissionDenied,
    NotAvailable,
    Timeout,
    Unknown,
}

impl CaptureError {
    /// Get a user-friendly description suitable for the overlay
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::NoMatch => "Didn't catch that",
            CaptureError::PermissionDenied => "Microphone permission required",
            CaptureError::Timeout => "Listening timed out",
            CaptureError::Network
            | CaptureError::Audio
            | CaptureError::NotAvailable
            | CaptureError::Unknown => "Speech recognition error",
        }
    }
}

/// Contract for the platform speech-capture capability.
///
/// Implementations own the recognizer lifecycle; `start_listening` begins
/// one attempt and reports through `events`. Dropping the sender without a
/// final event is treated as a silent cancellation by the pipeline.
pub trait SpeechCapture: Send + Sync {
    /// Begin one listening attempt for the given BCP-47 locale tag
    fn start_listening(&self, locale: &str, events: UnboundedSender<CaptureEvent>);

    /// Stop the in-flight attempt, if any
    fn stop_listening(&self);

    /// Whether speech recognition is usable right now
    fn is_available(&self) -> bool;

    /// Release recognizer resources; the capability is unusable afterwards
    fn shutdown(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_clamps_confidence() {
        assert_eq!(Transcript::new("hi", 1.7).confidence, 1.0);
        assert_eq!(Transcript::new("hi", -0.3).confidence, 0.0);
        assert_eq!(Transcript::new("hi", 0.42).confidence, 0.42);
    }

    #[test]
    fn test_error_user_messages() {
        assert_eq!(CaptureError::NoMatch.user_message(), "Didn't catch that");
        assert_eq!(
            CaptureError::PermissionDenied.user_message(),
            "Microphone permission required"
        );
        assert_eq!(CaptureError::Timeout.user_message(), "Listening timed out");
        assert_eq!(CaptureError::Audio.user_message(), "Speech recognition error");
        assert_eq!(CaptureError::Unknown.user_message(), "Speech recognition error");
    }
}
