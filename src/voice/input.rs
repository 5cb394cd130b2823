//! Voice input adapter boundary
//!
//! A [`VoiceInput`] runs one recognition session at a time and reports
//! through [`RecognitionCallbacks`]. Callbacks may fire from any thread; they
//! forward into a channel drained by the session controller.

use tokio::sync::mpsc;

use crate::conversation::Language;

/// Lifecycle and transcript notifications from a recognition session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Recognition actually started
    Start,
    /// Partial (`is_final == false`) or final transcript
    Transcript {
        /// Recognized text so far
        text: String,
        /// Whether this is the last transcript of the session
        is_final: bool,
    },
    /// Session failed
    Error(String),
    /// Session ended
    End,
}

/// Callback handle given to a [`VoiceInput`] for one session
#[derive(Debug, Clone)]
pub struct RecognitionCallbacks {
    session: u64,
    tx: mpsc::UnboundedSender<(u64, RecognitionEvent)>,
}

impl RecognitionCallbacks {
    /// Create callbacks for `session` and the receiving end of their channel
    #[must_use]
    pub fn channel(session: u64) -> (Self, mpsc::UnboundedReceiver<(u64, RecognitionEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { session, tx }, rx)
    }

    /// Session these callbacks belong to
    #[must_use]
    pub const fn session(&self) -> u64 {
        self.session
    }

    /// Recognition started
    pub fn on_start(&self) {
        self.emit(RecognitionEvent::Start);
    }

    /// Transcript update
    pub fn on_transcript(&self, text: impl Into<String>, is_final: bool) {
        self.emit(RecognitionEvent::Transcript {
            text: text.into(),
            is_final,
        });
    }

    /// Session failed
    pub fn on_error(&self, reason: impl Into<String>) {
        self.emit(RecognitionEvent::Error(reason.into()));
    }

    /// Session ended
    pub fn on_end(&self) {
        self.emit(RecognitionEvent::End);
    }

    fn emit(&self, event: RecognitionEvent) {
        if self.tx.send((self.session, event)).is_err() {
            tracing::trace!(session = self.session, "recognition event dropped, controller gone");
        }
    }
}

/// Platform speech-recognition capability
pub trait VoiceInput: Send + Sync {
    /// Whether recognition can run in this environment
    fn is_supported(&self) -> bool;

    /// Start a recognition session
    ///
    /// Returns false if recognition could not be started (unsupported
    /// environment or a session already active).
    fn start_listening(&self, language: Language, callbacks: RecognitionCallbacks) -> bool;

    /// Stop the active session, if any. Safe to call at any time.
    fn stop_listening(&self);
}

/// Voice input for environments without speech recognition
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedVoiceInput;

impl VoiceInput for UnsupportedVoiceInput {
    fn is_supported(&self) -> bool {
        false
    }

    fn start_listening(&self, _language: Language, _callbacks: RecognitionCallbacks) -> bool {
        false
    }

    fn stop_listening(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callbacks_forward_events_in_order() {
        let (callbacks, mut rx) = RecognitionCallbacks::channel(7);
        callbacks.on_start();
        callbacks.on_transcript("hel", false);
        callbacks.on_transcript("hello", true);
        callbacks.on_end();

        assert_eq!(rx.try_recv().unwrap(), (7, RecognitionEvent::Start));
        assert_eq!(
            rx.try_recv().unwrap(),
            (
                7,
                RecognitionEvent::Transcript {
                    text: "hel".to_string(),
                    is_final: false
                }
            )
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            (7, RecognitionEvent::Transcript { is_final: true, .. })
        ));
        assert_eq!(rx.try_recv().unwrap(), (7, RecognitionEvent::End));
    }

    #[test]
    fn callbacks_survive_dropped_receiver() {
        let (callbacks, rx) = RecognitionCallbacks::channel(1);
        drop(rx);
        callbacks.on_error("mic unplugged");
    }

    #[test]
    fn unsupported_input_never_starts() {
        let input = UnsupportedVoiceInput;
        let (callbacks, _rx) = RecognitionCallbacks::channel(1);
        assert!(!input.is_supported());
        assert!(!input.start_listening(Language::EnUs, callbacks));
        input.stop_listening();
        input.stop_listening();
    }
}
