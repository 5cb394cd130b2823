//! Utterance segmentation
//!
//! Splits a microphone stream into a single spoken utterance using local
//! energy detection: speech starts when RMS energy crosses a threshold and
//! ends after a run of silence.

use super::wav::SAMPLE_RATE;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count as an utterance (0.3 s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Silence duration that ends an utterance (0.5 s at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

/// Give up if nobody speaks within this many samples (8 s)
const NO_SPEECH_TIMEOUT_SAMPLES: usize = SAMPLE_RATE as usize * 8;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Speech detected, accumulating
    Speaking,
}

/// Outcome of feeding a chunk of samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    /// Still waiting for speech
    Waiting,
    /// Accumulating an utterance
    Capturing,
    /// Utterance finished, ready to take
    Complete,
    /// Nothing was said before the timeout
    TimedOut,
}

/// Detects the boundaries of one utterance
#[derive(Debug)]
pub struct UtteranceSegmenter {
    state: SegmenterState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
    idle_counter: usize,
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSegmenter {
    /// Create an idle segmenter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
            idle_counter: 0,
        }
    }

    /// Feed audio samples
    pub fn process(&mut self, samples: &[f32]) -> SegmentStatus {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                    return SegmentStatus::Capturing;
                }

                self.idle_counter += samples.len();
                if self.idle_counter > NO_SPEECH_TIMEOUT_SAMPLES {
                    tracing::debug!("no speech before timeout");
                    return SegmentStatus::TimedOut;
                }
                SegmentStatus::Waiting
            }
            SegmenterState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.is_complete() {
                    tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                    return SegmentStatus::Complete;
                }

                // Too much silence after a short blip: treat it as noise
                if self.silence_counter > SILENCE_SAMPLES * 2 {
                    tracing::trace!("noise blip, resetting");
                    self.state = SegmenterState::Idle;
                    self.speech_buffer.clear();
                    self.silence_counter = 0;
                    return SegmentStatus::Waiting;
                }

                SegmentStatus::Capturing
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.state == SegmenterState::Speaking
            && self.silence_counter > SILENCE_SAMPLES
            && self.speech_buffer.len() > MIN_SPEECH_SAMPLES
    }

    /// Accumulated speech so far
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Take the utterance and reset to idle
    pub fn take_utterance(&mut self) -> Vec<f32> {
        let utterance = std::mem::take(&mut self.speech_buffer);
        self.reset();
        utterance
    }

    /// Reset to idle
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
        self.idle_counter = 0;
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_calculation() {
        let silence = vec![0.0f32; 100];
        assert!(calculate_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(calculate_energy(&loud) > 0.4);

        assert!(calculate_energy(&[]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_noise_blip_resets() {
        let mut segmenter = UtteranceSegmenter::new();

        // 0.1 s blip, too short to count
        assert_eq!(segmenter.process(&[0.5; 1600]), SegmentStatus::Capturing);

        // Long silence afterwards drops it
        let status = segmenter.process(&[0.0; 16_001]);
        assert_eq!(status, SegmentStatus::Waiting);
        assert_eq!(segmenter.state(), SegmenterState::Idle);
        assert!(segmenter.speech_buffer().is_empty());
    }
}
