//! JARVIS - command classification and response dispatch for a voice assistant
//!
//! This library provides the assistant core:
//! - Command classification by keyword intent
//! - Offline canned replies and online AI/search delegation
//! - Voice input and speech output adapters
//! - A session controller publishing conversation and state events
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Front-ends                        │
//! │        Terminal chat  │  any SessionEvent consumer   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Session controller                    │
//! │  Classifier │ Dispatcher │ Conversation │ Speaker    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              External collaborators                  │
//! │  AI/search backend │ Speech recognition │ TTS        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod classifier;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod session;
pub mod setup;
pub mod voice;

pub use assistant::{
    Assistant, AssistantResponse, BuiltinAssistant, HttpAssistant, SearchProvider, WebSearchTool,
};
pub use classifier::{Intent, classify};
pub use config::Config;
pub use conversation::{ConversationStore, Language, Message, Role, SearchResult};
pub use dispatch::{Dispatcher, Reply, Responder};
pub use error::{Error, Result};
pub use events::{Notification, NotificationLevel, SessionEvent, SessionSnapshot};
pub use session::{Session, SessionBuilder, SessionState};
