//! Online strategy: delegate to the AI/search collaborator

use std::sync::Arc;

use async_trait::async_trait;

use super::{Reply, Responder};
use crate::assistant::Assistant;
use crate::conversation::Message;
use crate::session::SessionState;
use crate::{Error, Result};

/// Responder backed by an external [`Assistant`]
pub struct OnlineResponder {
    assistant: Arc<dyn Assistant>,
}

impl OnlineResponder {
    /// Wrap an assistant
    #[must_use]
    pub fn new(assistant: Arc<dyn Assistant>) -> Self {
        Self { assistant }
    }
}

#[async_trait]
impl Responder for OnlineResponder {
    fn name(&self) -> &'static str {
        "online"
    }

    async fn respond(&self, input: &str, state: &SessionState) -> Result<Reply> {
        tracing::debug!(
            backend = self.assistant.name(),
            language = %state.language,
            "forwarding command"
        );

        let response = self
            .assistant
            .process_command(input, state.language)
            .await
            .map_err(|e| match e {
                Error::Dispatch(_) => e,
                other => Error::Dispatch(other.to_string()),
            })?;

        if response.text.trim().is_empty() {
            return Err(Error::Dispatch(format!(
                "{} returned an empty reply",
                self.assistant.name()
            )));
        }

        let language = response.language.unwrap_or(state.language);
        let message = Message::assistant(response.text)
            .with_language(language)
            .with_search_results(response.data);

        Ok(Reply {
            message,
            should_speak: response.should_speak,
        })
    }
}
