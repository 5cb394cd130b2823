//! Voice input lifecycle through the session controller

use std::sync::Arc;

use jarvis::{Error, Language, Session, SessionEvent};

mod common;
use common::{MockAssistant, MockSpeech, MockVoiceInput, Script, settle, wait_for};

fn session_with(voice: Arc<MockVoiceInput>, online: bool) -> (Session, Arc<MockAssistant>) {
    let assistant = MockAssistant::new(Script::Echo);
    let (speech, _spoken) = MockSpeech::new();
    let session = Session::builder()
        .assistant(assistant.clone())
        .voice_input(voice)
        .speech_output(speech)
        .language(Language::EnUs)
        .online(online)
        .build();
    (session, assistant)
}

#[tokio::test]
async fn test_unsupported_voice_input_notifies() {
    let session = Session::builder().build();
    let mut events = session.subscribe();

    let result = session.toggle_listening();
    assert!(matches!(result, Err(Error::AdapterUnsupported(_))));
    assert!(!session.state().listening);

    let event = wait_for(&mut events, |e| matches!(e, SessionEvent::Notification(_))).await;
    let SessionEvent::Notification(notification) = event else {
        unreachable!()
    };
    assert_eq!(notification.title, "Voice input unavailable");
}

#[tokio::test]
async fn test_refused_start_leaves_session_idle() {
    let voice = MockVoiceInput::refusing();
    let (session, _) = session_with(voice.clone(), true);

    assert!(matches!(session.toggle_listening(), Err(Error::Recognition(_))));
    assert!(!session.state().listening);

    // Nothing active, so stopping does not reach the adapter
    session.stop_listening();
    assert_eq!(voice.stops(), 0);
}

#[tokio::test]
async fn test_final_transcript_is_submitted() {
    let voice = MockVoiceInput::new();
    let (session, assistant) = session_with(voice.clone(), true);
    let mut events = session.subscribe();

    assert!(session.toggle_listening().unwrap());
    assert_eq!(voice.last_language(), Some(Language::EnUs));

    let callbacks = voice.callbacks();
    callbacks.on_start();
    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged(s) if s.listening)
    })
    .await;
    assert!(session.state().listening);

    callbacks.on_transcript("what is", false);
    let event = wait_for(&mut events, |e| matches!(e, SessionEvent::Transcript { .. })).await;
    assert!(matches!(
        event,
        SessionEvent::Transcript { ref text, is_final: false } if text == "what is"
    ));

    callbacks.on_transcript("what is rust", true);
    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::MessageAppended(m) if !m.is_user())
    })
    .await;

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "what is rust");
    assert_eq!(messages[1].content, "echo: what is rust");
    assert_eq!(assistant.calls(), 1);

    // The session ended on its own
    assert!(!session.state().listening);
    assert_eq!(voice.stops(), 0);
}

#[tokio::test]
async fn test_recognition_error_resets_listening() {
    let voice = MockVoiceInput::new();
    let (session, assistant) = session_with(voice.clone(), true);
    let mut events = session.subscribe();

    session.toggle_listening().unwrap();
    let callbacks = voice.callbacks();
    callbacks.on_start();
    callbacks.on_error("no-speech");

    let event = wait_for(&mut events, |e| matches!(e, SessionEvent::Notification(_))).await;
    let SessionEvent::Notification(notification) = event else {
        unreachable!()
    };
    assert_eq!(notification.title, "Speech Error");
    assert!(notification.description.contains("no-speech"));

    assert!(!session.state().listening);
    assert!(session.messages().is_empty());
    assert_eq!(assistant.calls(), 0);

    // A new session can start right away
    assert!(session.toggle_listening().unwrap());
    assert_eq!(voice.started(), 2);
}

#[tokio::test]
async fn test_toggle_stops_active_session() {
    let voice = MockVoiceInput::new();
    let (session, _) = session_with(voice.clone(), true);

    assert!(session.toggle_listening().unwrap());
    voice.callbacks().on_start();
    settle().await;
    assert!(session.state().listening);

    assert!(!session.toggle_listening().unwrap());
    assert_eq!(voice.stops(), 1);
    assert!(!session.state().listening);

    // Idempotent once stopped
    session.stop_listening();
    session.stop_listening();
    assert_eq!(voice.stops(), 1);
}

#[tokio::test]
async fn test_stale_session_events_are_ignored() {
    let voice = MockVoiceInput::new();
    let (session, assistant) = session_with(voice.clone(), true);

    session.toggle_listening().unwrap();
    let stale = voice.callbacks();
    session.stop_listening();

    // Events from the stopped session arrive late
    stale.on_start();
    stale.on_transcript("too late", true);
    settle().await;

    assert!(!session.state().listening);
    assert!(session.messages().is_empty());
    assert_eq!(assistant.calls(), 0);
}

#[tokio::test]
async fn test_going_offline_stops_listening() {
    let voice = MockVoiceInput::new();
    let (session, _) = session_with(voice.clone(), true);

    session.toggle_listening().unwrap();
    voice.callbacks().on_start();
    settle().await;

    session.set_online(false);
    assert_eq!(voice.stops(), 1);
    assert!(!session.state().listening);
}

#[tokio::test]
async fn test_language_change_stops_listening() {
    let voice = MockVoiceInput::new();
    let (session, _) = session_with(voice.clone(), true);

    session.toggle_listening().unwrap();
    session.set_language(Language::RoRo);
    assert_eq!(voice.stops(), 1);

    session.toggle_listening().unwrap();
    assert_eq!(voice.last_language(), Some(Language::RoRo));
}

#[tokio::test]
async fn test_listening_requires_online() {
    let voice = MockVoiceInput::new();
    let (session, _) = session_with(voice.clone(), false);

    assert!(matches!(session.toggle_listening(), Err(Error::Offline)));
    assert_eq!(voice.started(), 0);
    assert!(!session.state().listening);

    session.set_online(true);
    assert!(session.toggle_listening().unwrap());
    assert_eq!(voice.started(), 1);
}
