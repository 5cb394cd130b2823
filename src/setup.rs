//! Interactive setup wizard (`jarvis setup`)

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Password, Select};

use crate::config::file::{
    self, AssistantFileConfig, ConfigFile, SearchFileConfig, SttFileConfig, VoiceFileConfig,
};
use crate::conversation::Language;

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("JARVIS Setup\n");

    let existing = file::load_config_file();
    let config_path = file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/jarvis/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. Language
    let languages = [Language::RoRo, Language::EnUs];
    let labels: Vec<String> = languages
        .iter()
        .map(|l| format!("{} ({})", l.display_name(), l.tag()))
        .collect();
    let default_language = existing
        .language
        .as_deref()
        .and_then(|l| l.parse::<Language>().ok())
        .and_then(|l| languages.iter().position(|&x| x == l))
        .unwrap_or(0);
    let language_idx = Select::new()
        .with_prompt("Conversation language")
        .items(&labels)
        .default(default_language)
        .interact()?;
    let language = languages[language_idx];

    // 2. Power state and greeting
    let online = Confirm::new()
        .with_prompt("Start online (use the AI/search assistant)?")
        .default(existing.online.unwrap_or(true))
        .interact()?;

    let greeting = Confirm::new()
        .with_prompt("Show the welcome message on start?")
        .default(existing.greeting.unwrap_or(true))
        .interact()?;

    // 3. Assistant backend
    let use_remote = Confirm::new()
        .with_prompt("Use a remote assistant endpoint?")
        .default(existing.assistant.endpoint.is_some())
        .interact()?;

    let assistant = if use_remote {
        let endpoint: String = Input::new()
            .with_prompt("Assistant endpoint URL")
            .with_initial_text(existing.assistant.endpoint.clone().unwrap_or_default())
            .interact_text()?;
        let api_key = prompt_secret(
            "Assistant API key",
            "JARVIS_ASSISTANT_KEY",
            existing.assistant.api_key,
        )?;
        AssistantFileConfig {
            endpoint: Some(endpoint),
            api_key,
            timeout_secs: existing.assistant.timeout_secs,
        }
    } else {
        AssistantFileConfig {
            timeout_secs: existing.assistant.timeout_secs,
            ..AssistantFileConfig::default()
        }
    };

    // 4. Web search for the built-in assistant
    let search = if use_remote {
        existing.search
    } else {
        SearchFileConfig {
            brave: prompt_secret("Brave Search API key", "BRAVE_API_KEY", existing.search.brave)?,
            serper: prompt_secret("Serper API key", "SERPER_API_KEY", existing.search.serper)?,
        }
    };

    // 5. Voice
    let elevenlabs_key = prompt_secret(
        "ElevenLabs API key (blank for local voice)",
        "ELEVENLABS_API_KEY",
        existing.voice.elevenlabs_key,
    )?;
    let voice = VoiceFileConfig {
        elevenlabs_key,
        ..existing.voice
    };

    // 6. Speech recognition
    let providers = ["whisper", "deepgram"];
    let default_provider = existing
        .stt
        .provider
        .as_deref()
        .and_then(|p| providers.iter().position(|&x| x.eq_ignore_ascii_case(p)))
        .unwrap_or(0);
    let provider_idx = Select::new()
        .with_prompt("Speech recognition provider")
        .items(&providers)
        .default(default_provider)
        .interact()?;

    let mut stt = SttFileConfig {
        provider: Some(providers[provider_idx].to_string()),
        ..existing.stt
    };
    if provider_idx == 0 {
        stt.openai_key = prompt_secret("OpenAI API key", "OPENAI_API_KEY", stt.openai_key)?;
    } else {
        stt.deepgram_key = prompt_secret("Deepgram API key", "DEEPGRAM_API_KEY", stt.deepgram_key)?;
    }

    let config_file = ConfigFile {
        language: Some(language.tag().to_string()),
        online: Some(online),
        greeting: Some(greeting),
        assistant,
        search,
        voice,
        stt,
    };

    file::write_config_file(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `jarvis chat` to start.");

    Ok(())
}

/// Prompt for a key, keeping the current one when left blank
fn prompt_secret(
    label: &str,
    env_hint: &str,
    current: Option<String>,
) -> anyhow::Result<Option<String>> {
    let prompt = match current.as_deref() {
        Some(key) => format!("{label} (current: {}, leave blank to keep)", mask(key)),
        None => format!("{label} ({env_hint}, leave blank to skip)"),
    };

    let input = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()?;

    Ok(if input.trim().is_empty() {
        current
    } else {
        Some(input.trim().to_string())
    })
}

/// Show only the ends of a key
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_keys() {
        assert_eq!(mask("sk-1234567890abcd"), "sk-1...abcd");
        assert_eq!(mask("short"), "****");
    }
}
