//! Speech output adapter
//!
//! [`SpeechOutput`] speaks one request and resolves when playback finishes.
//! [`Speaker`] sits in front of it and guarantees at most one playback at a
//! time: a new request aborts the one still running.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tokio::task::AbortHandle;

use super::tts::CloudTts;
use crate::conversation::Language;
use crate::{Error, Result};

/// External MP3 players tried in order when no device backend is compiled in
const PLAYERS: &[(&str, &[&str])] = &[
    ("mpv", &["--no-video", "--really-quiet"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
    ("afplay", &[]),
    ("mpg123", &["-q"]),
];

/// One utterance to speak
pub struct SpeechRequest {
    /// Text to speak
    pub text: String,
    /// Language of the text
    pub language: Language,
    /// Cloud voice key; the local voice is used when absent
    pub api_key: Option<SecretString>,
}

impl SpeechRequest {
    /// Request without a cloud key
    #[must_use]
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
            api_key: None,
        }
    }

    /// Attach a cloud voice key
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<SecretString>) -> Self {
        self.api_key = api_key;
        self
    }
}

impl Clone for SpeechRequest {
    fn clone(&self) -> Self {
        Self {
            text: self.text.clone(),
            language: self.language,
            api_key: self
                .api_key
                .as_ref()
                .map(|k| SecretString::from(k.expose_secret().to_owned())),
        }
    }
}

impl std::fmt::Debug for SpeechRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechRequest")
            .field("text", &self.text)
            .field("language", &self.language)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Capability to speak text aloud
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak `request`, resolving when playback completes
    ///
    /// Dropping the returned future must stop playback.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, request: &SpeechRequest) -> Result<()>;
}

/// Default speech output: cloud voice with a key, local voice without
pub struct VoiceSynthesizer {
    tts: CloudTts,
    local_command: Option<String>,
    player: Option<String>,
}

impl VoiceSynthesizer {
    /// Create a synthesizer using `tts` for keyed requests
    #[must_use]
    pub const fn new(tts: CloudTts) -> Self {
        Self {
            tts,
            local_command: None,
            player: None,
        }
    }

    /// Override the local voice command (text is appended as the last argument)
    #[must_use]
    pub fn with_local_command(mut self, command: Option<String>) -> Self {
        self.local_command = command.filter(|c| !c.trim().is_empty());
        self
    }

    /// Override the MP3 player command (file path is appended as the last argument)
    #[must_use]
    pub fn with_player(mut self, player: Option<String>) -> Self {
        self.player = player.filter(|p| !p.trim().is_empty());
        self
    }

    async fn speak_local(&self, text: &str, language: Language) -> Result<()> {
        let (program, args) = match &self.local_command {
            Some(command) => split_command(command)?,
            None => local_voice(language)?,
        };

        tracing::debug!(program = %program.display(), %language, "speaking with local voice");
        run_to_completion(Command::new(&program).args(&args).arg(text)).await
    }

    async fn play_mp3(&self, audio: Vec<u8>) -> Result<()> {
        #[cfg(feature = "audio")]
        if self.player.is_none() {
            return play_on_device(audio).await;
        }

        let (program, args) = match &self.player {
            Some(player) => split_command(player)?,
            None => external_player()?,
        };

        let file = TempAudio::write(&audio).await?;
        tracing::debug!(player = %program.display(), bytes = audio.len(), "playing speech");
        run_to_completion(Command::new(&program).args(&args).arg(file.path())).await
    }
}

impl Default for VoiceSynthesizer {
    fn default() -> Self {
        Self::new(CloudTts::default())
    }
}

#[async_trait]
impl SpeechOutput for VoiceSynthesizer {
    async fn speak(&self, request: &SpeechRequest) -> Result<()> {
        let text = request.text.trim();
        if text.is_empty() {
            return Ok(());
        }

        match &request.api_key {
            Some(key) if !key.expose_secret().trim().is_empty() => {
                let audio = self.tts.synthesize(text, key).await?;
                self.play_mp3(audio).await
            }
            _ => self.speak_local(text, request.language).await,
        }
    }
}

/// Result of a [`Speaker::speak`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Playback ran to the end
    Finished,
    /// A newer request or [`Speaker::cancel`] stopped it
    Preempted,
}

/// Serializes playback so only the newest request is audible
pub struct Speaker {
    output: Arc<dyn SpeechOutput>,
    current: Mutex<Option<(u64, AbortHandle)>>,
    generation: AtomicU64,
}

impl Speaker {
    /// Wrap a speech output
    #[must_use]
    pub fn new(output: Arc<dyn SpeechOutput>) -> Self {
        Self {
            output,
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Speak `request`, aborting any playback still running
    ///
    /// # Errors
    ///
    /// Returns the output's error, or [`Error::Speech`] if the playback task panicked
    pub async fn speak(&self, request: SpeechRequest) -> Result<SpeakOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let output = Arc::clone(&self.output);
        let task = tokio::spawn(async move { output.speak(&request).await });

        if let Some((previous, handle)) = self
            .lock_current()
            .replace((generation, task.abort_handle()))
        {
            tracing::debug!(previous, generation, "preempting speech");
            handle.abort();
        }

        let result = task.await;

        {
            let mut current = self.lock_current();
            if current.as_ref().is_some_and(|(g, _)| *g == generation) {
                *current = None;
            }
        }

        match result {
            Ok(Ok(())) => Ok(SpeakOutcome::Finished),
            Ok(Err(e)) => Err(e),
            Err(e) if e.is_cancelled() => Ok(SpeakOutcome::Preempted),
            Err(e) => Err(Error::Speech(e.to_string())),
        }
    }

    /// Stop the running playback, if any
    ///
    /// Returns whether something was cancelled.
    pub fn cancel(&self) -> bool {
        match self.lock_current().take() {
            Some((generation, handle)) => {
                tracing::debug!(generation, "speech cancelled");
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a playback is running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock_current().is_some()
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<(u64, AbortHandle)>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Local voice program and arguments for `language`
fn local_voice(language: Language) -> Result<(PathBuf, Vec<String>)> {
    for program in ["espeak-ng", "espeak"] {
        if let Ok(path) = which::which(program) {
            let voice = match language {
                Language::RoRo => "ro",
                Language::EnUs => "en-us",
            };
            return Ok((path, vec!["-v".to_string(), voice.to_string()]));
        }
    }

    if let Ok(path) = which::which("say") {
        let voice = match language {
            Language::RoRo => "Ioana",
            Language::EnUs => "Samantha",
        };
        return Ok((path, vec!["-v".to_string(), voice.to_string()]));
    }

    Err(Error::Speech(
        "no local voice found (install espeak-ng or set voice.local_command)".to_string(),
    ))
}

/// First MP3 player found on `PATH`
fn external_player() -> Result<(PathBuf, Vec<String>)> {
    PLAYERS
        .iter()
        .find_map(|(name, args)| {
            which::which(name)
                .ok()
                .map(|path| (path, args.iter().map(ToString::to_string).collect()))
        })
        .ok_or_else(|| {
            Error::Audio("no MP3 player found (install mpv or set voice.player)".to_string())
        })
}

/// Split a configured command line on whitespace
fn split_command(command: &str) -> Result<(PathBuf, Vec<String>)> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| Error::Config("empty command".to_string()))?;
    Ok((
        PathBuf::from(program),
        parts.map(ToString::to_string).collect(),
    ))
}

/// Run a child to completion; it is killed if the future is dropped
async fn run_to_completion(command: &mut Command) -> Result<()> {
    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| Error::Speech(format!("failed to run voice command: {e}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::Speech(format!("voice command exited with {status}")))
    }
}

/// Play MP3 on the output device; dropping the future stops playback
#[cfg(feature = "audio")]
async fn play_on_device(audio: Vec<u8>) -> Result<()> {
    use std::sync::atomic::AtomicBool;

    struct StopOnDrop(Arc<AtomicBool>);

    impl Drop for StopOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::Release);
        }
    }

    let stop = Arc::new(AtomicBool::new(false));
    let _guard = StopOnDrop(Arc::clone(&stop));

    tokio::task::spawn_blocking(move || {
        let playback = super::playback::AudioPlayback::new()?;
        playback.play_mp3_blocking(&audio, &stop)
    })
    .await
    .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
}

/// Synthesized audio written to the temp dir, removed on drop
struct TempAudio {
    path: PathBuf,
}

impl TempAudio {
    async fn write(audio: &[u8]) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("jarvis-{}.mp3", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, audio).await?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::trace!(error = %e, path = %self.path.display(), "failed to remove temp audio");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    struct SlowOutput;

    #[async_trait]
    impl SpeechOutput for SlowOutput {
        async fn speak(&self, request: &SpeechRequest) -> Result<()> {
            if request.text == "long" {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(())
        }
    }

    #[test]
    fn split_command_keeps_arguments() {
        let (program, args) = split_command("espeak-ng -s 150").unwrap();
        assert_eq!(program, PathBuf::from("espeak-ng"));
        assert_eq!(args, vec!["-s", "150"]);
        assert!(split_command("   ").is_err());
    }

    #[test]
    fn request_debug_hides_key() {
        let request = SpeechRequest::new("hi", Language::EnUs)
            .with_api_key(Some(SecretString::from("sk-secret".to_string())));
        let debug = format!("{request:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(request.clone().api_key.is_some());
    }

    #[tokio::test]
    async fn new_request_preempts_running_one() {
        let speaker = Arc::new(Speaker::new(Arc::new(SlowOutput)));

        let first = tokio::spawn({
            let speaker = Arc::clone(&speaker);
            async move { speaker.speak(SpeechRequest::new("long", Language::EnUs)).await }
        });

        while !speaker.is_active() {
            tokio::task::yield_now().await;
        }

        let second = speaker
            .speak(SpeechRequest::new("short", Language::EnUs))
            .await
            .unwrap();
        assert_eq!(second, SpeakOutcome::Finished);
        assert_eq!(first.await.unwrap().unwrap(), SpeakOutcome::Preempted);
        assert!(!speaker.is_active());
    }

    #[tokio::test]
    async fn cancel_without_playback_is_noop() {
        let speaker = Speaker::new(Arc::new(SlowOutput));
        assert!(!speaker.cancel());
        assert!(!speaker.is_active());
    }

    #[tokio::test]
    async fn empty_text_is_silent() {
        let synthesizer = VoiceSynthesizer::default();
        synthesizer
            .speak(&SpeechRequest::new("   ", Language::RoRo))
            .await
            .unwrap();
    }
}
