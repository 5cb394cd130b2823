//! Response dispatch
//!
//! A single [`Dispatcher`] selects between the offline and online
//! [`Responder`] strategies based on [`SessionState::online`].

mod offline;
mod online;

use std::sync::Arc;

use async_trait::async_trait;

pub use offline::{OfflineResponder, canned_reply, format_time_of_day};
pub use online::OnlineResponder;

use crate::Result;
use crate::assistant::Assistant;
use crate::conversation::Message;
use crate::session::SessionState;

/// Assistant message produced for one turn
#[derive(Debug, Clone)]
pub struct Reply {
    /// Message to append to the conversation
    pub message: Message,
    /// Whether the controller should speak the reply
    pub should_speak: bool,
}

/// Capability to produce a reply for a command
#[async_trait]
pub trait Responder: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Produce a reply
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Dispatch`] if an external collaborator fails
    async fn respond(&self, input: &str, state: &SessionState) -> Result<Reply>;
}

/// Routes commands to the strategy matching the session's power state
pub struct Dispatcher {
    offline: OfflineResponder,
    online: OnlineResponder,
}

impl Dispatcher {
    /// Create a dispatcher whose online strategy uses `assistant`
    #[must_use]
    pub fn new(assistant: Arc<dyn Assistant>) -> Self {
        Self {
            offline: OfflineResponder,
            online: OnlineResponder::new(assistant),
        }
    }

    /// Strategy for the given power state
    #[must_use]
    pub fn strategy(&self, online: bool) -> &dyn Responder {
        if online { &self.online } else { &self.offline }
    }

    /// Produce a reply for `input` under `state`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Dispatch`] if the online collaborator fails
    pub async fn respond(&self, input: &str, state: &SessionState) -> Result<Reply> {
        let responder = self.strategy(state.online);
        tracing::debug!(strategy = responder.name(), "dispatching command");
        responder.respond(input, state).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::Error;
    use crate::assistant::AssistantResponse;
    use crate::conversation::{Language, SearchResult};

    #[derive(Default)]
    struct CountingAssistant {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Assistant for CountingAssistant {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn process_command(
            &self,
            command: &str,
            _language: Language,
        ) -> Result<AssistantResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if command == "fail" {
                return Err(Error::Search("backend down".to_string()));
            }
            Ok(AssistantResponse::text("3 results found")
                .with_data(vec![
                    SearchResult {
                        title: "r1".to_string(),
                        snippet: String::new(),
                        url: "https://a.example".to_string(),
                        source: "a.example".to_string(),
                    },
                    SearchResult {
                        title: "r2".to_string(),
                        snippet: String::new(),
                        url: "https://b.example".to_string(),
                        source: "b.example".to_string(),
                    },
                ])
                .spoken())
        }
    }

    fn state(online: bool) -> SessionState {
        SessionState {
            online,
            language: Language::EnUs,
            ..SessionState::default()
        }
    }

    #[tokio::test]
    async fn offline_never_calls_assistant() {
        let assistant = Arc::new(CountingAssistant::default());
        let dispatcher = Dispatcher::new(assistant.clone());

        let reply = dispatcher.respond("system status", &state(false)).await.unwrap();
        assert_eq!(
            reply.message.content,
            "All systems operational. Power levels optimal. Ready to assist."
        );
        assert!(!reply.should_speak);
        assert_eq!(assistant.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn online_merges_assistant_reply() {
        let assistant = Arc::new(CountingAssistant::default());
        let dispatcher = Dispatcher::new(assistant.clone());

        let reply = dispatcher.respond("search rust", &state(true)).await.unwrap();
        assert_eq!(reply.message.content, "3 results found");
        assert_eq!(reply.message.language, Some(Language::EnUs));
        assert!(reply.should_speak);

        let titles: Vec<_> = reply
            .message
            .search_results
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, ["r1", "r2"]);
        assert_eq!(assistant.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn assistant_errors_become_dispatch_failures() {
        let dispatcher = Dispatcher::new(Arc::new(CountingAssistant::default()));
        let result = dispatcher.respond("fail", &state(true)).await;
        assert!(matches!(result, Err(Error::Dispatch(_))));
    }

    #[test]
    fn strategy_follows_power_state() {
        let dispatcher = Dispatcher::new(Arc::new(CountingAssistant::default()));
        assert_eq!(dispatcher.strategy(true).name(), "online");
        assert_eq!(dispatcher.strategy(false).name(), "offline");
    }
}
