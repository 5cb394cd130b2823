//! TOML configuration file loading
//!
//! Supports `~/.config/jarvis/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Conversation language ("ro-RO" or "en-US")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Start online
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,

    /// Seed the conversation with the welcome message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<bool>,

    /// Remote assistant
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Web search keys
    #[serde(default)]
    pub search: SearchFileConfig,

    /// Speech output
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Speech recognition
    #[serde(default)]
    pub stt: SttFileConfig,
}

/// Remote assistant configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AssistantFileConfig {
    /// Endpoint URL; the built-in assistant is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Web search configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchFileConfig {
    /// Brave Search API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brave: Option<String>,

    /// Serper (Google) API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serper: Option<String>,
}

/// Speech output configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VoiceFileConfig {
    /// ElevenLabs API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevenlabs_key: Option<String>,

    /// ElevenLabs voice id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,

    /// ElevenLabs model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Local voice command override (e.g. "espeak-ng -s 150")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_command: Option<String>,

    /// MP3 player override (e.g. "mpv --really-quiet")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SttFileConfig {
    /// "whisper" or "deepgram"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// `OpenAI` API key for Whisper
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_key: Option<String>,

    /// Deepgram API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deepgram_key: Option<String>,

    /// Model override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Serialize and write the config file, creating parent directories
///
/// # Errors
///
/// Returns error if the file cannot be serialized or written
pub fn write_config_file(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml = toml::to_string_pretty(config)
        .map_err(|e| crate::Error::Config(format!("failed to serialize config: {e}")))?;
    std::fs::write(path, toml)?;

    tracing::info!(path = %path.display(), "config file written");
    Ok(())
}

/// Return the config file path: `~/.config/jarvis/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("jarvis").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_file_from(&dir.path().join("nope.toml"));
        assert!(config.language.is_none());
        assert!(config.assistant.endpoint.is_none());
    }

    #[test]
    fn malformed_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "language = [").unwrap();
        assert!(load_config_file_from(&path).language.is_none());
    }

    #[test]
    fn written_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ConfigFile {
            language: Some("en-US".to_string()),
            online: Some(false),
            voice: VoiceFileConfig {
                elevenlabs_key: Some("xi-test".to_string()),
                ..VoiceFileConfig::default()
            },
            ..ConfigFile::default()
        };
        write_config_file(&path, &config).unwrap();

        let loaded = load_config_file_from(&path);
        assert_eq!(loaded.language.as_deref(), Some("en-US"));
        assert_eq!(loaded.online, Some(false));
        assert_eq!(loaded.voice.elevenlabs_key.as_deref(), Some("xi-test"));
        assert!(loaded.stt.provider.is_none());
    }
}
