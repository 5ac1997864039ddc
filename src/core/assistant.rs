//! LLM Assistant service.
//!

use crate::config::AppConfig;
use crate::core::traits::ReplyGenerator;
use crate::error::CompletionError;
use crate::infrastructure::entities;
use crate::infrastructure::traits::{CompletionClient, CompletionRequest};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::debug;
use minijinja::{Environment, context};
use serde::Serialize;

/// Number of history entries that are sent along with a new message.
pub const HISTORY_LIMIT: usize = 10;

/// Returned instead of calling the completion service when no credential is configured.
pub const UNAVAILABLE_REPLY: &str =
    "הבוט פעיל אבל חסר OPENAI_API_KEY, יש להגדיר מפתח כדי לקבל תשובות AI.";

const DEFAULT_PERSONA_TEMPLATE: &str = "You are {{ bot_name }}, a Hebrew-first customer support assistant\
{% if alias %} for {{ alias }}{% endif %}. Respond clearly, briefly, and practically.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> ChatMessage {
        ChatMessage {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl From<entities::AuthorType> for Role {
    fn from(author: entities::AuthorType) -> Self {
        match author {
            entities::AuthorType::Customer => Role::User,
            entities::AuthorType::Bot | entities::AuthorType::Human => Role::Assistant,
        }
    }
}

/// Outcome of a reply generation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Generated(String),
    /// The assistant is not configured; carries the fixed informational text.
    Unavailable(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Generated(text) | Reply::Unavailable(text) => text,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Reply::Generated(_) => "generated",
            Reply::Unavailable(_) => "unavailable",
        }
    }
}

/// System instruction of a location, or the default persona if none is configured.
pub fn system_prompt(location: &entities::Location) -> String {
    match location.system_prompt.as_deref().map(str::trim) {
        Some(prompt) if !prompt.is_empty() => prompt.to_owned(),
        _ => default_persona(location),
    }
}

fn default_persona(location: &entities::Location) -> String {
    let alias = location.alias.as_deref().map(str::trim).unwrap_or("");
    let env = Environment::new();

    env.render_str(
        DEFAULT_PERSONA_TEMPLATE,
        context! {
            bot_name => location.bot_name.trim(),
            alias => alias,
        },
    )
    .unwrap_or_else(|_| {
        format!(
            "You are {}, a Hebrew-first customer support assistant. Respond clearly, briefly, and practically.",
            location.bot_name.trim()
        )
    })
}

/// Builds the prompt: system instruction, the tail of the history, then the new message.
pub fn build_prompt(
    location: &entities::Location,
    history: &[entities::Message],
    user_message: &str,
) -> Vec<ChatMessage> {
    let with_text: Vec<ChatMessage> = history
        .iter()
        .filter_map(|message| match message.text.as_deref() {
            Some(text) if !text.is_empty() => Some(ChatMessage::new(message.author_type.into(), text)),
            _ => None,
        })
        .collect();
    let start = with_text.len().saturating_sub(HISTORY_LIMIT);

    let mut prompt = Vec::with_capacity(with_text.len() - start + 2);
    prompt.push(ChatMessage::new(Role::System, system_prompt(location)));
    prompt.extend(with_text.into_iter().skip(start));
    prompt.push(ChatMessage::new(Role::User, user_message));
    prompt
}

#[injectable(ReplyGenerator)]
pub struct AssistantReplyGenerator {
    config: Ref<AppConfig>,
    client: Ref<dyn CompletionClient>,
}

#[async_trait]
impl ReplyGenerator for AssistantReplyGenerator {
    async fn generate(
        &self,
        location: &entities::Location,
        history: &[entities::Message],
        user_message: &str,
    ) -> Result<Reply, CompletionError> {
        if !self.config.completion_configured() {
            return Ok(Reply::Unavailable(UNAVAILABLE_REPLY.to_owned()));
        }

        let messages = build_prompt(location, history, user_message);
        debug!(
            "requesting completion for location {} with {} prompt messages",
            location.id,
            messages.len()
        );

        let text = self
            .client
            .complete(CompletionRequest {
                model: location.model.clone(),
                temperature: location.temperature,
                messages,
            })
            .await?;

        Ok(Reply::Generated(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::entities::{AuthorType, Direction, HandoffMode};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use sqlx::types::Json;

    fn location(system_prompt: Option<&str>) -> entities::Location {
        entities::Location {
            id: "loc-1".to_owned(),
            alias: Some("Acme".to_owned()),
            public_key: "pk".to_owned(),
            bot_name: "Rushingbot".to_owned(),
            system_prompt: system_prompt.map(str::to_owned),
            model: "gpt-4.1-mini".to_owned(),
            temperature: 0.2,
            bot_enabled: true,
            demo_enabled: true,
            handoff_mode: HandoffMode::OnHumanReply,
            support_email: None,
            support_whatsapp: None,
            theme_color: "#2f5bff".to_owned(),
            crm_api_key: None,
            agency_location_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn message(index: i64, author_type: AuthorType, text: Option<&str>) -> entities::Message {
        entities::Message {
            id: format!("m-{index}"),
            conversation_id: "c-1".to_owned(),
            direction: Direction::Inbound,
            channel: "web".to_owned(),
            author_type,
            sender_name: None,
            text: text.map(str::to_owned),
            media_url: None,
            meta: Json(json!({})),
            created_at: Utc::now() + Duration::seconds(index),
        }
    }

    #[test]
    fn test_role_from_author_type() {
        assert_eq!(Role::from(AuthorType::Customer), Role::User);
        assert_eq!(Role::from(AuthorType::Bot), Role::Assistant);
        assert_eq!(Role::from(AuthorType::Human), Role::Assistant);
    }

    #[test]
    fn test_configured_system_prompt_wins() {
        assert_eq!(system_prompt(&location(Some("  Be kind.  "))), "Be kind.");
    }

    #[test]
    fn test_blank_system_prompt_uses_persona() {
        let prompt = system_prompt(&location(Some("   ")));
        assert!(prompt.starts_with("You are Rushingbot"));
        assert!(prompt.contains("for Acme"));
    }

    #[test]
    fn test_prompt_shape() {
        let history = vec![
            message(1, AuthorType::Customer, Some("hi")),
            message(2, AuthorType::Bot, Some("hello, how can I help?")),
            message(3, AuthorType::Human, None),
        ];

        let prompt = build_prompt(&location(None), &history, "where is my order?");

        assert_eq!(prompt.len(), 4);
        assert_eq!(prompt[0].role, Role::System);
        assert_eq!(prompt[1], ChatMessage::new(Role::User, "hi"));
        assert_eq!(prompt[2], ChatMessage::new(Role::Assistant, "hello, how can I help?"));
        assert_eq!(prompt[3], ChatMessage::new(Role::User, "where is my order?"));
    }

    #[test]
    fn test_prompt_keeps_last_ten_entries_with_text() {
        let history: Vec<_> = (0..15)
            .map(|i| message(i, AuthorType::Customer, Some(&format!("msg {i}"))))
            .chain(std::iter::once(message(15, AuthorType::Bot, Some(""))))
            .collect();

        let prompt = build_prompt(&location(None), &history, "latest");

        assert_eq!(prompt.len(), HISTORY_LIMIT + 2);
        assert_eq!(prompt[1].content, "msg 5");
        assert_eq!(prompt[HISTORY_LIMIT].content, "msg 14");
        assert_eq!(prompt[HISTORY_LIMIT + 1].content, "latest");
    }

    #[test]
    fn test_chat_message_serializes_lowercase_role() {
        let value = serde_json::to_value(ChatMessage::new(Role::Assistant, "ok")).unwrap();
        assert_eq!(value, json!({ "role": "assistant", "content": "ok" }));
    }

    #[test]
    fn test_reply_status() {
        assert_eq!(Reply::Generated("x".into()).status(), "generated");
        assert_eq!(Reply::Unavailable(UNAVAILABLE_REPLY.into()).text(), UNAVAILABLE_REPLY);
    }
}
