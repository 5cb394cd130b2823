//! Offline strategy: canned replies keyed by intent

use async_trait::async_trait;
use chrono::{DateTime, Local};

use super::{Reply, Responder};
use crate::Result;
use crate::classifier::{Intent, classify};
use crate::conversation::{Language, Message};
use crate::session::SessionState;

/// Format a wall-clock time as locale time-of-day
#[must_use]
pub fn format_time_of_day(now: DateTime<Local>, language: Language) -> String {
    match language {
        Language::EnUs => now.format("%-I:%M:%S %p").to_string(),
        Language::RoRo => now.format("%H:%M:%S").to_string(),
    }
}

/// Canned reply text for an intent
#[must_use]
pub fn canned_reply(intent: Intent, language: Language, now: DateTime<Local>) -> String {
    match (language, intent) {
        (Language::EnUs, Intent::Greeting) => "Hello there. I'm at your service.".to_string(),
        (Language::EnUs, Intent::Weather) => "I would need access to weather services to provide \
            current conditions. Please connect me to a weather API for real-time data."
            .to_string(),
        (Language::EnUs, Intent::Time) => {
            format!("The current time is {}.", format_time_of_day(now, language))
        }
        (Language::EnUs, Intent::Status) => {
            "All systems operational. Power levels optimal. Ready to assist.".to_string()
        }
        (Language::EnUs, Intent::WebSearch) => {
            "Web search requires an online connection. Please bring me back online.".to_string()
        }
        (Language::EnUs, Intent::OpenApp) => {
            "I need to be online to open applications.".to_string()
        }
        (Language::EnUs, Intent::Fallback) => "I understand your request. However, I would need \
            additional integrations and API connections to provide more specific assistance. \
            Please configure my services through the settings panel."
            .to_string(),

        (Language::RoRo, Intent::Greeting) => "Salut. Sunt la dispoziția ta.".to_string(),
        (Language::RoRo, Intent::Weather) => "Am nevoie de acces la un serviciu meteo pentru a \
            oferi condițiile actuale. Conectează-mă la un API meteo pentru date în timp real."
            .to_string(),
        (Language::RoRo, Intent::Time) => {
            format!("Ora curentă este {}.", format_time_of_day(now, language))
        }
        (Language::RoRo, Intent::Status) => {
            "Toate sistemele funcționează. Nivel de energie optim. Pregătit să ajut.".to_string()
        }
        (Language::RoRo, Intent::WebSearch) => {
            "Căutarea pe web necesită conexiune. Treci-mă înapoi online.".to_string()
        }
        (Language::RoRo, Intent::OpenApp) => {
            "Trebuie să fiu online pentru a deschide aplicații.".to_string()
        }
        (Language::RoRo, Intent::Fallback) => "Am înțeles cererea ta. Totuși, am nevoie de \
            integrări și conexiuni API suplimentare pentru a oferi asistență mai specifică. \
            Configurează serviciile mele din panoul de setări."
            .to_string(),
    }
}

/// Local responder that never leaves the process
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineResponder;

impl OfflineResponder {
    /// Reply to `input` as of `now`
    #[must_use]
    pub fn respond_at(self, input: &str, now: DateTime<Local>) -> Message {
        let intent = classify(input);
        tracing::debug!(%intent, "offline reply");
        Message::assistant(canned_reply(intent, Language::EnUs, now))
    }
}

#[async_trait]
impl Responder for OfflineResponder {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn respond(&self, input: &str, _state: &SessionState) -> Result<Reply> {
        Ok(Reply {
            message: self.respond_at(input, Local::now()),
            should_speak: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn afternoon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 15, 4, 5).unwrap()
    }

    #[test]
    fn time_reply_embeds_formatted_time() {
        let message = OfflineResponder.respond_at("what time is it", afternoon());
        assert_eq!(message.content, "The current time is 3:04:05 PM.");
    }

    #[test]
    fn status_reply_is_fixed() {
        let message = OfflineResponder.respond_at("system status", afternoon());
        assert_eq!(
            message.content,
            "All systems operational. Power levels optimal. Ready to assist."
        );
        assert!(message.search_results.is_none());
        assert!(!message.is_user());
    }

    #[test]
    fn reply_depends_only_on_input() {
        let a = OfflineResponder.respond_at("hello", afternoon());
        let b = OfflineResponder.respond_at("HELLO", afternoon());
        assert_eq!(a.content, b.content);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn romanian_time_uses_24_hour_clock() {
        let text = canned_reply(Intent::Time, Language::RoRo, afternoon());
        assert_eq!(text, "Ora curentă este 15:04:05.");
    }

    #[test]
    fn every_intent_has_a_reply_in_both_languages() {
        let intents = [
            Intent::Greeting,
            Intent::Weather,
            Intent::Time,
            Intent::Status,
            Intent::WebSearch,
            Intent::OpenApp,
            Intent::Fallback,
        ];
        for language in [Language::EnUs, Language::RoRo] {
            for intent in intents {
                assert!(!canned_reply(intent, language, afternoon()).is_empty());
            }
        }
    }
}
