//! Configuration management for JARVIS
//!
//! Values are layered env > config file > defaults.

pub mod file;

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::assistant::{Assistant, BuiltinAssistant, HttpAssistant, WebSearchTool};
use crate::conversation::Language;
use crate::session::Session;
use crate::voice::{
    CloudTts, DEFAULT_MODEL, DEFAULT_VOICE_ID, SpeechToText, SttProvider, UnsupportedVoiceInput,
    VoiceInput, VoiceSynthesizer,
};
use crate::{Error, Result};

use self::file::ConfigFile;

/// Default assistant request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// JARVIS configuration
#[derive(Debug)]
pub struct Config {
    /// Conversation language
    pub language: Language,

    /// Start online
    pub online: bool,

    /// Seed the conversation with the welcome message
    pub greeting: bool,

    /// Remote assistant
    pub assistant: AssistantConfig,

    /// Web search keys for the built-in assistant
    pub search: SearchConfig,

    /// Speech output
    pub voice: VoiceConfig,

    /// Speech recognition
    pub stt: SttConfig,
}

/// Remote assistant configuration
#[derive(Debug)]
pub struct AssistantConfig {
    /// Endpoint URL (`JARVIS_ASSISTANT_URL`); built-in assistant when unset
    pub endpoint: Option<String>,

    /// Bearer token (`JARVIS_ASSISTANT_KEY`)
    pub api_key: Option<SecretString>,

    /// Request timeout
    pub timeout: Duration,
}

/// Web search configuration
#[derive(Debug, Default)]
pub struct SearchConfig {
    /// Brave Search API key (`BRAVE_API_KEY`)
    pub brave: Option<SecretString>,

    /// Serper API key (`SERPER_API_KEY`)
    pub serper: Option<SecretString>,
}

/// Speech output configuration
#[derive(Debug)]
pub struct VoiceConfig {
    /// ElevenLabs API key (`ELEVENLABS_API_KEY`)
    pub elevenlabs_key: Option<SecretString>,

    /// ElevenLabs voice id
    pub voice_id: String,

    /// ElevenLabs model
    pub model: String,

    /// Local voice command override
    pub local_command: Option<String>,

    /// MP3 player override
    pub player: Option<String>,
}

/// Speech recognition configuration
#[derive(Debug)]
pub struct SttConfig {
    /// Provider
    pub provider: SttProvider,

    /// `OpenAI` key for Whisper (`OPENAI_API_KEY`)
    pub openai_key: Option<SecretString>,

    /// Deepgram key (`DEEPGRAM_API_KEY`)
    pub deepgram_key: Option<SecretString>,

    /// Model override
    pub model: Option<String>,
}

impl Config {
    /// Load configuration from the config file and environment
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn from_sources(fc: ConfigFile, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secret = |key: &str, fallback: Option<String>| {
            env(key)
                .or(fallback)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };

        let language = env("JARVIS_LANGUAGE")
            .or(fc.language)
            .map(|l| l.parse::<Language>())
            .transpose()?
            .unwrap_or_default();

        let online = match env("JARVIS_ONLINE") {
            Some(v) => parse_bool(&v)
                .ok_or_else(|| Error::Config(format!("invalid JARVIS_ONLINE value: {v}")))?,
            None => fc.online.unwrap_or(true),
        };

        let assistant = AssistantConfig {
            endpoint: env("JARVIS_ASSISTANT_URL").or(fc.assistant.endpoint),
            api_key: secret("JARVIS_ASSISTANT_KEY", fc.assistant.api_key),
            timeout: Duration::from_secs(
                fc.assistant.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };

        let search = SearchConfig {
            brave: secret("BRAVE_API_KEY", fc.search.brave),
            serper: secret("SERPER_API_KEY", fc.search.serper),
        };

        let voice = VoiceConfig {
            elevenlabs_key: secret("ELEVENLABS_API_KEY", fc.voice.elevenlabs_key),
            voice_id: fc
                .voice
                .voice_id
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            model: fc.voice.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            local_command: fc.voice.local_command,
            player: fc.voice.player,
        };

        let provider = match fc.stt.provider.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("whisper") => SttProvider::Whisper,
            Some("deepgram") => SttProvider::Deepgram,
            Some(other) => {
                return Err(Error::Config(format!("unknown STT provider: {other}")));
            }
        };

        let stt = SttConfig {
            provider,
            openai_key: secret("OPENAI_API_KEY", fc.stt.openai_key),
            deepgram_key: secret("DEEPGRAM_API_KEY", fc.stt.deepgram_key),
            model: fc.stt.model,
        };

        Ok(Self {
            language,
            online,
            greeting: fc.greeting.unwrap_or(true),
            assistant,
            search,
            voice,
            stt,
        })
    }

    /// Web search tool for the built-in assistant; Brave is preferred
    #[must_use]
    pub fn search_tool(&self) -> Option<WebSearchTool> {
        if let Some(key) = &self.search.brave {
            return Some(WebSearchTool::new_brave(key.expose_secret().to_owned()));
        }
        self.search
            .serper
            .as_ref()
            .map(|key| WebSearchTool::new_serper(key.expose_secret().to_owned()))
    }

    /// AI/search collaborator: remote when an endpoint is set, built-in otherwise
    ///
    /// # Errors
    ///
    /// Returns error if the remote client cannot be built
    pub fn build_assistant(&self) -> Result<Arc<dyn Assistant>> {
        if let Some(endpoint) = &self.assistant.endpoint {
            tracing::info!(endpoint = %endpoint, "using remote assistant");
            let api_key = self
                .assistant
                .api_key
                .as_ref()
                .map(|k| SecretString::from(k.expose_secret().to_owned()));
            let assistant =
                HttpAssistant::with_timeout(endpoint.clone(), api_key, self.assistant.timeout)?;
            return Ok(Arc::new(assistant));
        }

        let search = self.search_tool();
        tracing::info!(
            search = search.as_ref().map_or("none", |s| s.provider().name()),
            "using built-in assistant"
        );
        Ok(Arc::new(BuiltinAssistant::new(search)))
    }

    /// Speech output from the voice settings
    #[must_use]
    pub fn build_speech_output(&self) -> VoiceSynthesizer {
        VoiceSynthesizer::new(CloudTts::elevenlabs(&self.voice.voice_id, &self.voice.model))
            .with_local_command(self.voice.local_command.clone())
            .with_player(self.voice.player.clone())
    }

    /// STT client for the configured provider, if its key is set
    #[must_use]
    pub fn build_stt(&self) -> Option<SpeechToText> {
        let key = match self.stt.provider {
            SttProvider::Whisper => self.stt.openai_key.as_ref(),
            SttProvider::Deepgram => self.stt.deepgram_key.as_ref(),
        }?;

        SpeechToText::new(
            self.stt.provider,
            SecretString::from(key.expose_secret().to_owned()),
            self.stt.model.clone(),
        )
        .map_err(|e| tracing::warn!(error = %e, "speech recognition disabled"))
        .ok()
    }

    /// Voice input: the microphone when built with `audio` and STT is configured
    #[must_use]
    pub fn build_voice_input(&self) -> Arc<dyn VoiceInput> {
        #[cfg(feature = "audio")]
        if let (Some(stt), Ok(runtime)) = (self.build_stt(), tokio::runtime::Handle::try_current())
        {
            return Arc::new(crate::voice::MicrophoneInput::new(stt, runtime));
        }

        tracing::debug!("voice input unavailable");
        Arc::new(UnsupportedVoiceInput)
    }

    /// Session wired from this configuration
    ///
    /// # Errors
    ///
    /// Returns error if the assistant cannot be built
    pub fn build_session(&self) -> Result<Session> {
        Ok(Session::builder()
            .assistant(self.build_assistant()?)
            .voice_input(self.build_voice_input())
            .speech_output(Arc::new(self.build_speech_output()))
            .language(self.language)
            .online(self.online)
            .voice_api_key(
                self.voice
                    .elevenlabs_key
                    .as_ref()
                    .map(|k| SecretString::from(k.expose_secret().to_owned())),
            )
            .welcome(self.greeting)
            .build())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
