//! Session controller
//!
//! [`Session`] owns the [`SessionState`] and the conversation. It turns
//! discrete front-end events (submit, toggle listening, toggle power,
//! language and key changes) into dispatcher calls, conversation updates,
//! speech, and [`SessionEvent`]s on a broadcast stream.
//!
//! At most one command is processed at a time. A result that arrives after
//! the power state changed is dropped without being appended or spoken.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{broadcast, mpsc};

use crate::assistant::{Assistant, BuiltinAssistant};
use crate::conversation::{ConversationStore, Language, Message};
use crate::dispatch::Dispatcher;
use crate::events::{Notification, SessionEvent, SessionSnapshot};
use crate::voice::{
    RecognitionCallbacks, RecognitionEvent, SpeakOutcome, Speaker, SpeechOutput, SpeechRequest,
    UnsupportedVoiceInput, VoiceInput, VoiceSynthesizer,
};
use crate::{Error, Result};

/// Default event channel capacity
const EVENT_CAPACITY: usize = 256;

/// Mutable per-session settings and flags
pub struct SessionState {
    /// Online strategy selected
    pub online: bool,
    /// Recognition session active
    pub listening: bool,
    /// Speech playback running
    pub speaking: bool,
    /// Conversation language
    pub language: Language,
    /// Cloud voice key
    pub voice_api_key: Option<SecretString>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            online: true,
            listening: false,
            speaking: false,
            language: Language::default(),
            voice_api_key: None,
        }
    }
}

impl Clone for SessionState {
    fn clone(&self) -> Self {
        Self {
            online: self.online,
            listening: self.listening,
            speaking: self.speaking,
            language: self.language,
            voice_api_key: self
                .voice_api_key
                .as_ref()
                .map(|k| SecretString::from(k.expose_secret().to_owned())),
        }
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("online", &self.online)
            .field("listening", &self.listening)
            .field("speaking", &self.speaking)
            .field("language", &self.language)
            .field("voice_api_key", &self.voice_api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Builder for [`Session`]
pub struct SessionBuilder {
    assistant: Option<Arc<dyn Assistant>>,
    voice_input: Option<Arc<dyn VoiceInput>>,
    speech_output: Option<Arc<dyn SpeechOutput>>,
    state: SessionState,
    welcome: bool,
    capacity: usize,
}

impl SessionBuilder {
    /// AI/search collaborator for the online strategy
    #[must_use]
    pub fn assistant(mut self, assistant: Arc<dyn Assistant>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    /// Voice input adapter
    #[must_use]
    pub fn voice_input(mut self, voice_input: Arc<dyn VoiceInput>) -> Self {
        self.voice_input = Some(voice_input);
        self
    }

    /// Speech output adapter
    #[must_use]
    pub fn speech_output(mut self, speech_output: Arc<dyn SpeechOutput>) -> Self {
        self.speech_output = Some(speech_output);
        self
    }

    /// Initial language
    #[must_use]
    pub const fn language(mut self, language: Language) -> Self {
        self.state.language = language;
        self
    }

    /// Initial power state
    #[must_use]
    pub const fn online(mut self, online: bool) -> Self {
        self.state.online = online;
        self
    }

    /// Initial cloud voice key
    #[must_use]
    pub fn voice_api_key(mut self, key: Option<SecretString>) -> Self {
        self.state.voice_api_key = key.filter(|k| !k.expose_secret().trim().is_empty());
        self
    }

    /// Seed the conversation with the welcome message
    #[must_use]
    pub const fn welcome(mut self, welcome: bool) -> Self {
        self.welcome = welcome;
        self
    }

    /// Event channel capacity
    #[must_use]
    pub const fn event_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build the session
    #[must_use]
    pub fn build(self) -> Session {
        let assistant = self
            .assistant
            .unwrap_or_else(|| Arc::new(BuiltinAssistant::default()));
        let voice_input = self
            .voice_input
            .unwrap_or_else(|| Arc::new(UnsupportedVoiceInput));
        let speech_output = self
            .speech_output
            .unwrap_or_else(|| Arc::new(VoiceSynthesizer::default()));

        let conversation = if self.welcome {
            ConversationStore::with_welcome(self.state.language)
        } else {
            ConversationStore::new()
        };

        let (events, _) = broadcast::channel(self.capacity.max(1));

        tracing::debug!(
            assistant = assistant.name(),
            voice_supported = voice_input.is_supported(),
            online = self.state.online,
            language = %self.state.language,
            "session created"
        );

        Session {
            inner: Arc::new(Inner {
                dispatcher: Dispatcher::new(assistant),
                voice_input,
                speaker: Speaker::new(speech_output),
                state: Mutex::new(self.state),
                conversation: Mutex::new(conversation),
                events,
                busy: AtomicBool::new(false),
                power_epoch: AtomicU64::new(0),
                voice_session: Mutex::new(None),
                next_voice_session: AtomicU64::new(0),
            }),
        }
    }
}

struct Inner {
    dispatcher: Dispatcher,
    voice_input: Arc<dyn VoiceInput>,
    speaker: Speaker,
    state: Mutex<SessionState>,
    conversation: Mutex<ConversationStore>,
    events: broadcast::Sender<SessionEvent>,
    busy: AtomicBool,
    /// Bumped on every power change; in-flight results from an older epoch are dropped
    power_epoch: AtomicU64,
    /// Id of the active recognition session
    voice_session: Mutex<Option<u64>>,
    next_voice_session: AtomicU64,
}

/// Clears the busy flag when a turn ends, however it ends
struct BusyGuard<'a>(&'a Inner);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::Release);
        self.0.publish_state();
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_conversation(&self) -> MutexGuard<'_, ConversationStore> {
        self.conversation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_voice_session(&self) -> MutexGuard<'_, Option<u64>> {
        self.voice_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            online: state.online,
            listening: state.listening,
            speaking: state.speaking,
            busy: self.busy.load(Ordering::Acquire),
            language: state.language,
            has_voice_key: state.voice_api_key.is_some(),
        }
    }

    fn publish_state(&self) {
        self.publish(SessionEvent::StateChanged(self.snapshot()));
    }

    fn notify(&self, notification: Notification) {
        tracing::info!(
            level = ?notification.level,
            title = %notification.title,
            description = %notification.description,
            "notification"
        );
        self.publish(SessionEvent::Notification(notification));
    }

    fn notify_error(&self, error: &Error) {
        tracing::warn!(error = %error, "session error");
        self.publish(SessionEvent::Notification(Notification::from(error)));
    }

    fn append(&self, message: Message) {
        self.lock_conversation().push(message.clone());
        self.publish(SessionEvent::MessageAppended(message));
    }

    /// Forget the active recognition session without calling the adapter
    fn end_voice_session(&self, id: u64) -> bool {
        {
            let mut session = self.lock_voice_session();
            if *session != Some(id) {
                return false;
            }
            *session = None;
        }
        self.lock_state().listening = false;
        self.publish_state();
        true
    }

    fn stop_listening(&self) {
        let active = self.lock_voice_session().take();
        if let Some(id) = active {
            tracing::debug!(session = id, "stopping voice input");
            self.voice_input.stop_listening();
        }

        let was_listening = std::mem::replace(&mut self.lock_state().listening, false);
        if active.is_some() || was_listening {
            self.publish_state();
        }
    }

    fn cancel_speech(&self) {
        if self.speaker.cancel() {
            self.lock_state().speaking = false;
            self.publish_state();
        }
    }
}

/// The assistant session controller
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Start building a session
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder {
            assistant: None,
            voice_input: None,
            speech_output: None,
            state: SessionState::default(),
            welcome: false,
            capacity: EVENT_CAPACITY,
        }
    }

    /// Subscribe to session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Copy of the current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.lock_state().clone()
    }

    /// Current observable state
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot()
    }

    /// Copy of the conversation so far
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock_conversation().messages().to_vec()
    }

    /// Whether a command is being processed
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Submit a typed or transcribed command
    ///
    /// Appends the user message, dispatches it, and appends the reply.
    /// Returns the reply, or `None` when the input was blank, the dispatch
    /// failed (a notification is published), or the power state changed
    /// while the reply was in flight. Speech runs in the background.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if a previous command is still in flight
    pub async fn submit(&self, input: &str) -> Result<Option<Message>> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let inner = &*self.inner;
        if inner.busy.swap(true, Ordering::AcqRel) {
            tracing::debug!("rejecting submission while busy");
            return Err(Error::Busy);
        }
        let guard = BusyGuard(inner);

        let epoch = inner.power_epoch.load(Ordering::Acquire);
        let state = self.state();

        inner.append(Message::user(input).with_language(state.language));
        inner.publish_state();

        tracing::info!(online = state.online, language = %state.language, "processing command");
        let result = inner.dispatcher.respond(input, &state).await;

        if inner.power_epoch.load(Ordering::Acquire) != epoch {
            tracing::info!("power state changed while processing, discarding reply");
            return Ok(None);
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                inner.notify_error(&e);
                return Ok(None);
            }
        };

        let message = reply.message;
        inner.append(message.clone());
        drop(guard);

        if reply.should_speak {
            let language = message.language.unwrap_or(state.language);
            self.spawn_speech(message.content.clone(), language, epoch);
        }

        Ok(Some(message))
    }

    /// Speak `text` now, preempting anything already playing
    ///
    /// Failures are published as notifications and never touch the
    /// conversation.
    pub async fn speak(&self, text: impl Into<String>, language: Language) -> Option<SpeakOutcome> {
        let inner = &*self.inner;
        let api_key = {
            let mut state = inner.lock_state();
            state.speaking = true;
            state
                .voice_api_key
                .as_ref()
                .map(|k| SecretString::from(k.expose_secret().to_owned()))
        };
        inner.publish_state();

        let request = SpeechRequest::new(text, language).with_api_key(api_key);
        let outcome = inner.speaker.speak(request).await;

        inner.lock_state().speaking = inner.speaker.is_active();
        inner.publish_state();

        match outcome {
            Ok(outcome) => {
                tracing::debug!(?outcome, "speech done");
                Some(outcome)
            }
            Err(e) => {
                let error = match e {
                    Error::Speech(_) | Error::Tts(_) | Error::Audio(_) => e,
                    other => Error::Speech(other.to_string()),
                };
                inner.notify_error(&error);
                None
            }
        }
    }

    fn spawn_speech(&self, text: String, language: Language, epoch: u64) {
        let session = self.clone();
        tokio::spawn(async move {
            if session.inner.power_epoch.load(Ordering::Acquire) != epoch {
                return;
            }
            session.speak(text, language).await;
        });
    }

    /// Stop any speech playback
    pub fn cancel_speech(&self) {
        self.inner.cancel_speech();
    }

    /// Start or stop voice input
    ///
    /// Must be called from within a Tokio runtime. Returns whether a
    /// recognition session is now active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] while a command is in flight,
    /// [`Error::Offline`] while the session is offline,
    /// [`Error::AdapterUnsupported`] if recognition is unavailable, or
    /// [`Error::Recognition`] if the adapter refused to start
    pub fn toggle_listening(&self) -> Result<bool> {
        let inner = &*self.inner;
        if inner.lock_voice_session().is_some() {
            inner.stop_listening();
            return Ok(false);
        }

        if self.is_busy() {
            return Err(Error::Busy);
        }

        if !inner.lock_state().online {
            tracing::debug!("voice input requested while offline");
            return Err(Error::Offline);
        }

        if !inner.voice_input.is_supported() {
            let error = Error::AdapterUnsupported(
                "speech recognition is not available in this environment".to_string(),
            );
            inner.notify_error(&error);
            return Err(error);
        }

        let id = inner.next_voice_session.fetch_add(1, Ordering::AcqRel) + 1;
        let (callbacks, events) = RecognitionCallbacks::channel(id);
        *inner.lock_voice_session() = Some(id);

        let language = inner.lock_state().language;
        if !inner.voice_input.start_listening(language, callbacks) {
            inner.lock_voice_session().take();
            let error = Error::Recognition("voice input could not be started".to_string());
            inner.notify_error(&error);
            return Err(error);
        }

        tracing::info!(session = id, %language, "voice input started");
        tokio::spawn(pump_recognition(Arc::downgrade(&self.inner), events));
        Ok(true)
    }

    /// Stop voice input; safe to call at any time
    pub fn stop_listening(&self) {
        self.inner.stop_listening();
    }

    /// Switch between online and offline strategies
    ///
    /// Going offline stops voice input and speech, and any reply still in
    /// flight is discarded.
    pub fn set_online(&self, online: bool) {
        let inner = &*self.inner;
        {
            let mut state = inner.lock_state();
            if state.online == online {
                return;
            }
            state.online = online;
        }
        inner.power_epoch.fetch_add(1, Ordering::AcqRel);

        if !online {
            inner.stop_listening();
            inner.cancel_speech();
        }

        tracing::info!(online, "power state changed");
        inner.publish_state();
        inner.notify(if online {
            Notification::info("Online", "Systems online. Connected to AI services.")
        } else {
            Notification::info("Offline", "Running in offline mode.")
        });
    }

    /// Flip the power state, returning the new value
    pub fn toggle_power(&self) -> bool {
        let online = !self.inner.lock_state().online;
        self.set_online(online);
        online
    }

    /// Change the conversation language
    ///
    /// An active recognition session is stopped since it was started for
    /// the previous language.
    pub fn set_language(&self, language: Language) {
        let inner = &*self.inner;
        {
            let mut state = inner.lock_state();
            if state.language == language {
                return;
            }
            state.language = language;
        }
        inner.stop_listening();

        tracing::info!(%language, "language changed");
        inner.publish_state();
        inner.notify(Notification::info(
            "Language",
            format!("Language set to {}.", language.display_name()),
        ));
    }

    /// Set or clear the cloud voice key; blank keys clear it
    pub fn set_voice_api_key(&self, key: Option<SecretString>) {
        let key = key.filter(|k| !k.expose_secret().trim().is_empty());
        let saved = key.is_some();
        self.inner.lock_state().voice_api_key = key;

        tracing::info!(saved, "voice key updated");
        self.inner.publish_state();
        self.inner.notify(if saved {
            Notification::info("Voice", "Voice API key saved. Using cloud voice.")
        } else {
            Notification::info("Voice", "Voice API key cleared. Using local voice.")
        });
    }
}

/// Drain one recognition session's callbacks
async fn pump_recognition(
    inner: Weak<Inner>,
    mut events: mpsc::UnboundedReceiver<(u64, RecognitionEvent)>,
) {
    while let Some((id, event)) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let terminal = matches!(
            event,
            RecognitionEvent::End
                | RecognitionEvent::Error(_)
                | RecognitionEvent::Transcript { is_final: true, .. }
        );

        if *inner.lock_voice_session() != Some(id) {
            tracing::trace!(session = id, "ignoring stale recognition event");
            if terminal {
                break;
            }
            continue;
        }

        match event {
            RecognitionEvent::Start => {
                inner.lock_state().listening = true;
                inner.publish_state();
            }
            RecognitionEvent::Transcript {
                text,
                is_final: false,
            } => {
                inner.publish(SessionEvent::Transcript {
                    text,
                    is_final: false,
                });
            }
            RecognitionEvent::Transcript {
                text,
                is_final: true,
            } => {
                inner.end_voice_session(id);
                inner.publish(SessionEvent::Transcript {
                    text: text.clone(),
                    is_final: true,
                });

                tracing::info!(session = id, transcript = %text, "final transcript");
                let session = Session { inner };
                if let Err(e) = session.submit(&text).await {
                    session.inner.notify_error(&e);
                }
            }
            RecognitionEvent::Error(reason) => {
                inner.end_voice_session(id);
                inner.notify_error(&Error::Recognition(reason));
            }
            RecognitionEvent::End => {
                inner.end_voice_session(id);
                tracing::debug!(session = id, "voice input ended");
            }
        }

        if terminal {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_online_romanian() {
        let state = SessionState::default();
        assert!(state.online);
        assert!(!state.listening);
        assert!(!state.speaking);
        assert_eq!(state.language, Language::RoRo);
        assert!(state.voice_api_key.is_none());
    }

    #[test]
    fn state_debug_hides_key() {
        let state = SessionState {
            voice_api_key: Some(SecretString::from("xi-secret".to_string())),
            ..SessionState::default()
        };
        assert!(!format!("{state:?}").contains("xi-secret"));
        assert!(state.clone().voice_api_key.is_some());
    }

    #[test]
    fn builder_filters_blank_key() {
        let session = Session::builder()
            .voice_api_key(Some(SecretString::from("  ".to_string())))
            .build();
        assert!(!session.snapshot().has_voice_key);
    }

    #[test]
    fn welcome_is_optional() {
        assert!(Session::builder().build().messages().is_empty());

        let session = Session::builder()
            .language(Language::EnUs)
            .welcome(true)
            .build();
        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].is_user());
    }

    #[test]
    fn stop_listening_is_idempotent() {
        let session = Session::builder().build();
        session.stop_listening();
        session.stop_listening();
        assert!(!session.state().listening);
    }
}
