//! Microphone-backed voice input
//!
//! Each session runs on its own thread: capture, segment one utterance,
//! transcribe it through the cloud STT client, then report and exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cpal::traits::HostTrait;
use tokio::runtime::Handle;

use super::capture::AudioCapture;
use super::input::{RecognitionCallbacks, VoiceInput};
use super::segmenter::{SegmentStatus, UtteranceSegmenter};
use super::stt::SpeechToText;
use super::wav::{SAMPLE_RATE, samples_to_wav};
use crate::conversation::Language;

/// Interval between buffer polls
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stop flag of the running capture thread
///
/// Only the thread releases its own flag, so a new session cannot start
/// until the previous thread has exited.
#[derive(Default)]
struct SessionSlot(Mutex<Option<Arc<AtomicBool>>>);

impl SessionSlot {
    /// Reserve the slot for a new session
    fn claim(&self) -> Option<Arc<AtomicBool>> {
        let mut active = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stop) = active.as_ref() {
            if stop.load(Ordering::Acquire) {
                tracing::debug!("previous microphone session still shutting down");
            } else {
                tracing::debug!("microphone session already active");
            }
            return None;
        }
        let stop = Arc::new(AtomicBool::new(false));
        *active = Some(Arc::clone(&stop));
        Some(stop)
    }

    /// Ask the running session to stop; returns false if none is running
    fn signal_stop(&self) -> bool {
        let active = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        active
            .as_ref()
            .is_some_and(|stop| !stop.swap(true, Ordering::AcqRel))
    }

    /// Free the slot if it still holds `stop`
    fn release(&self, stop: &Arc<AtomicBool>) {
        let mut active = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|a| Arc::ptr_eq(a, stop)) {
            *active = None;
        }
    }
}

/// Voice input that listens on the default microphone
pub struct MicrophoneInput {
    stt: Arc<SpeechToText>,
    runtime: Handle,
    active: Arc<SessionSlot>,
}

impl MicrophoneInput {
    /// Create an input that transcribes with `stt` on `runtime`
    #[must_use]
    pub fn new(stt: SpeechToText, runtime: Handle) -> Self {
        Self {
            stt: Arc::new(stt),
            runtime,
            active: Arc::new(SessionSlot::default()),
        }
    }
}

impl VoiceInput for MicrophoneInput {
    fn is_supported(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    fn start_listening(&self, language: Language, callbacks: RecognitionCallbacks) -> bool {
        let Some(stop) = self.active.claim() else {
            return false;
        };

        let stt = Arc::clone(&self.stt);
        let runtime = self.runtime.clone();
        let active = Arc::clone(&self.active);

        let spawned = std::thread::Builder::new()
            .name("jarvis-mic".to_string())
            .spawn({
                let stop = Arc::clone(&stop);
                move || {
                    run_session(&stt, &runtime, language, &callbacks, &stop);
                    active.release(&stop);
                }
            });

        if let Err(e) = spawned {
            tracing::error!(error = %e, "failed to spawn microphone thread");
            self.active.release(&stop);
            return false;
        }

        true
    }

    fn stop_listening(&self) {
        if self.active.signal_stop() {
            tracing::debug!("microphone session stopping");
        }
    }
}

fn run_session(
    stt: &SpeechToText,
    runtime: &Handle,
    language: Language,
    callbacks: &RecognitionCallbacks,
    stop: &AtomicBool,
) {
    let mut capture = match AudioCapture::new().and_then(|mut c| c.start().map(|()| c)) {
        Ok(capture) => capture,
        Err(e) => {
            callbacks.on_error(e.to_string());
            return;
        }
    };

    callbacks.on_start();
    let mut segmenter = UtteranceSegmenter::new();

    let utterance = loop {
        if stop.load(Ordering::Acquire) {
            capture.stop();
            callbacks.on_end();
            return;
        }

        std::thread::sleep(POLL_INTERVAL);
        let samples = capture.take_buffer();
        if samples.is_empty() {
            continue;
        }

        match segmenter.process(&samples) {
            SegmentStatus::Complete => break segmenter.take_utterance(),
            SegmentStatus::TimedOut => {
                capture.stop();
                callbacks.on_end();
                return;
            }
            SegmentStatus::Waiting | SegmentStatus::Capturing => {}
        }
    };

    capture.stop();

    let transcript = samples_to_wav(&utterance, SAMPLE_RATE)
        .and_then(|wav| runtime.block_on(stt.transcribe(&wav, language)));

    if stop.load(Ordering::Acquire) {
        callbacks.on_end();
        return;
    }

    match transcript {
        Ok(text) if !text.is_empty() => {
            callbacks.on_transcript(text, true);
            callbacks.on_end();
        }
        Ok(_) => callbacks.on_end(),
        Err(e) => callbacks.on_error(e.to_string()),
    }
}
