//! Shared test utilities
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jarvis::voice::{RecognitionCallbacks, SpeechOutput, SpeechRequest, VoiceInput};
use jarvis::{Assistant, AssistantResponse, Error, Language, SearchResult, SessionEvent};
use tokio::sync::{Semaphore, broadcast, mpsc};

/// Build a search result
pub fn result(title: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        snippet: format!("About {title}"),
        url: format!("https://{title}.example"),
        source: format!("{title}.example"),
    }
}

/// What the mock assistant does on each call
#[derive(Clone)]
pub enum Script {
    /// Always return this response
    Reply(AssistantResponse),
    /// Echo the command back with the request language
    Echo,
    /// Fail like an unreachable backend
    Fail,
}

/// Mock AI/search collaborator
pub struct MockAssistant {
    script: Script,
    calls: AtomicUsize,
    commands: Mutex<Vec<(String, Language)>>,
    gate: Option<Semaphore>,
}

impl MockAssistant {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    /// Calls block until [`MockAssistant::release`] is called
    pub fn gated(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(0)),
        })
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<(String, Language)> {
        self.commands.lock().unwrap().clone()
    }

    /// Wait until `n` calls have started
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.calls() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("assistant was not called");
    }
}

#[async_trait]
impl Assistant for MockAssistant {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn process_command(
        &self,
        command: &str,
        language: Language,
    ) -> jarvis::Result<AssistantResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.commands
            .lock()
            .unwrap()
            .push((command.to_string(), language));

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        match &self.script {
            Script::Reply(response) => Ok(response.clone()),
            Script::Echo => Ok(AssistantResponse::text(format!("echo: {command}")).with_language(language)),
            Script::Fail => Err(Error::Dispatch("connection refused".to_string())),
        }
    }
}

/// Mock speech output recording what it was asked to say
pub struct MockSpeech {
    spoken: mpsc::UnboundedSender<String>,
    fail: bool,
}

impl MockSpeech {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (spoken, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { spoken, fail: false }), rx)
    }

    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (spoken, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { spoken, fail: true }), rx)
    }
}

#[async_trait]
impl SpeechOutput for MockSpeech {
    async fn speak(&self, request: &SpeechRequest) -> jarvis::Result<()> {
        let _ = self.spoken.send(request.text.clone());

        if self.fail {
            return Err(Error::Speech("no audio device".to_string()));
        }
        // "long" keeps playing until preempted
        if request.text == "long" {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(())
    }
}

/// Mock voice input driven by the test through the captured callbacks
pub struct MockVoiceInput {
    supported: bool,
    accept: bool,
    sessions: Mutex<Vec<(Language, RecognitionCallbacks)>>,
    stops: AtomicUsize,
}

impl MockVoiceInput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            accept: true,
            sessions: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        })
    }

    /// Supported, but refuses to start
    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            accept: false,
            sessions: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        })
    }

    /// Callbacks of the most recent session
    pub fn callbacks(&self) -> RecognitionCallbacks {
        self.sessions
            .lock()
            .unwrap()
            .last()
            .map(|(_, c)| c.clone())
            .expect("no recognition session started")
    }

    pub fn started(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn last_language(&self) -> Option<Language> {
        self.sessions.lock().unwrap().last().map(|(l, _)| *l)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl VoiceInput for MockVoiceInput {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start_listening(&self, language: Language, callbacks: RecognitionCallbacks) -> bool {
        if !self.accept {
            return false;
        }
        self.sessions.lock().unwrap().push((language, callbacks));
        true
    }

    fn stop_listening(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wait for the first event matching `pred`
pub async fn wait_for(
    events: &mut broadcast::Receiver<SessionEvent>,
    mut pred: impl FnMut(&SessionEvent) -> bool,
) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Let spawned tasks run for a moment
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
