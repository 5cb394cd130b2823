//! Voice input and speech output
//!
//! Recognition and synthesis sit behind the [`VoiceInput`] and
//! [`SpeechOutput`] traits. Device capture and playback need the `audio`
//! feature; without it speech is played through external commands.

#[cfg(feature = "audio")]
mod capture;
mod input;
#[cfg(feature = "audio")]
mod microphone;
mod output;
#[cfg(feature = "audio")]
mod playback;
mod segmenter;
mod stt;
mod tts;
mod wav;

#[cfg(feature = "audio")]
pub use capture::AudioCapture;
pub use input::{RecognitionCallbacks, RecognitionEvent, UnsupportedVoiceInput, VoiceInput};
#[cfg(feature = "audio")]
pub use microphone::MicrophoneInput;
pub use output::{SpeakOutcome, Speaker, SpeechOutput, SpeechRequest, VoiceSynthesizer};
#[cfg(feature = "audio")]
pub use playback::AudioPlayback;
pub use segmenter::{SegmentStatus, SegmenterState, UtteranceSegmenter, calculate_energy};
pub use stt::{SpeechToText, SttProvider};
pub use tts::{CloudTts, DEFAULT_MODEL, DEFAULT_VOICE_ID, TtsProvider};
pub use wav::{SAMPLE_RATE, duration_ms, samples_to_wav};
