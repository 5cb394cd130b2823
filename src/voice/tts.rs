//! Text-to-speech (TTS) over cloud APIs

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Default ElevenLabs voice
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDzARwuCx";

/// Multilingual model, needed for Romanian
pub const DEFAULT_MODEL: &str = "eleven_multilingual_v2";

/// TTS provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtsProvider {
    /// ElevenLabs
    ElevenLabs,
    /// `OpenAI` speech
    OpenAI,
}

/// Synthesizes MP3 speech from text
///
/// The API key is supplied per call so it can change during a session.
#[derive(Debug, Clone)]
pub struct CloudTts {
    client: reqwest::Client,
    provider: TtsProvider,
    voice: String,
    model: String,
}

impl CloudTts {
    /// ElevenLabs synthesizer
    #[must_use]
    pub fn elevenlabs(voice_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider: TtsProvider::ElevenLabs,
            voice: voice_id.into(),
            model: model.into(),
        }
    }

    /// `OpenAI` synthesizer
    #[must_use]
    pub fn openai(voice: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider: TtsProvider::OpenAI,
            voice: voice.into(),
            model: "tts-1".to_string(),
        }
    }

    /// Provider in use
    #[must_use]
    pub const fn provider(&self) -> TtsProvider {
        self.provider
    }

    /// Synthesize `text`, returning MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if the key is empty or synthesis fails
    pub async fn synthesize(&self, text: &str, api_key: &SecretString) -> Result<Vec<u8>> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Tts("API key required for cloud speech".to_string()));
        }

        match self.provider {
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text, api_key).await,
            TtsProvider::OpenAI => self.synthesize_openai(text, api_key).await,
        }
    }

    async fn synthesize_openai(&self, text: &str, api_key: &SecretString) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    async fn synthesize_elevenlabs(&self, text: &str, api_key: &SecretString) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            urlencoding::encode(&self.voice)
        );

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key.expose_secret())
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }
}

impl Default for CloudTts {
    fn default() -> Self {
        Self::elevenlabs(DEFAULT_VOICE_ID, DEFAULT_MODEL)
    }
}
