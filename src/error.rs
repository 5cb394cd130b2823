//! Error types for the JARVIS core

use thiserror::Error;

/// Result type alias for JARVIS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the JARVIS core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Voice input is not available in this runtime
    #[error("voice input unsupported: {0}")]
    AdapterUnsupported(String),

    /// Speech recognition failed mid-session
    #[error("recognition error: {0}")]
    Recognition(String),

    /// AI/search collaborator call failed
    #[error("dispatch failure: {0}")]
    Dispatch(String),

    /// Speech output failed
    #[error("speech failure: {0}")]
    Speech(String),

    /// A response is still in flight
    #[error("busy: a previous command is still being processed")]
    Busy,

    /// Voice input needs the online strategy
    #[error("offline: voice input is only available online")]
    Offline,

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Web search error
    #[error("search error: {0}")]
    Search(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Short user-facing title for notifications
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::AdapterUnsupported(_) => "Voice input unavailable",
            Self::Recognition(_) => "Speech Error",
            Self::Speech(_) | Self::Tts(_) | Self::Audio(_) => "Speech output failed",
            Self::Busy => "Busy",
            Self::Offline => "Offline",
            _ => "Error",
        }
    }
}
