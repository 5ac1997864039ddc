//! Channel entry points: CRM webhook, widget/demo sandbox and agent console.

use crate::core::lifecycle::StatusTrigger;
use crate::core::traits::{DemoTurn, IngestionCoordinator, ReplyGenerator, WebhookOutcome};
use crate::core::webhook::{UNKNOWN, WebhookEvent};
use crate::error::ServiceError;
use crate::infrastructure::entities::{
    AuthorType, ConversationPatch, ConversationStatus, Direction, Location, Message, NewMessage,
};
use crate::infrastructure::traits::{
    ConversationRepository, LocationRepository, MessageRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::{debug, error, info, warn};
use serde_json::{Value, json};
use uuid::Uuid;

/// Stored and returned when the assistant fails during a widget turn.
pub const FALLBACK_REPLY: &str = "מצטער, זמנית אין מענה. נציג יחזור בהקדם.";

pub const WEB_CHANNEL: &str = "web";

#[injectable(IngestionCoordinator)]
pub struct InboxIngestionCoordinator {
    locations: Ref<dyn LocationRepository>,
    conversations: Ref<dyn ConversationRepository>,
    messages: Ref<dyn MessageRepository>,
    replies: Ref<dyn ReplyGenerator>,
}

impl InboxIngestionCoordinator {
    async fn require_location(&self, location_id: &str) -> Result<Location, ServiceError> {
        self.locations
            .get_location(location_id)
            .await?
            .ok_or(ServiceError::NotFound("location"))
    }

    fn require_text(text: &str) -> Result<(), ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::InvalidInput("text must not be empty".to_owned()));
        }
        Ok(())
    }

    /// Runs the assistant, never failing: errors become the fixed apology.
    async fn answer(&self, location: &Location, history: &[Message], text: &str) -> (String, &'static str) {
        match self.replies.generate(location, history, text).await {
            Ok(reply) => (reply.text().to_owned(), reply.status()),
            Err(e) => {
                error!("failed generating bot reply for location {}: {e}", location.id);
                (FALLBACK_REPLY.to_owned(), "fallback")
            }
        }
    }
}

#[async_trait]
impl IngestionCoordinator for InboxIngestionCoordinator {
    async fn ingest_webhook(&self, payload: &Value) -> Result<WebhookOutcome, ServiceError> {
        let event = WebhookEvent::from_payload(payload);

        let Some((conversation_id, location_id)) = event.attribution() else {
            warn!(
                "dropping CRM webhook without conversation or location: event_type={:?} conversation_id={:?} location_id={:?}",
                event.event_type, event.conversation_id, event.location_id
            );
            return Ok(WebhookOutcome::Dropped {
                reason: "missing conversation or location",
            });
        };

        let Some(location) = self.locations.get_location(location_id).await? else {
            warn!("dropping CRM webhook for unknown location {location_id}");
            return Ok(WebhookOutcome::Dropped {
                reason: "unknown location",
            });
        };

        if let Some(existing) = self.conversations.get_conversation(conversation_id).await? {
            if existing.location_id != location.id {
                warn!(
                    "dropping CRM webhook: conversation {conversation_id} belongs to location {}, not {location_id}",
                    existing.location_id
                );
                return Ok(WebhookOutcome::Dropped {
                    reason: "conversation owned by another location",
                });
            }
        }

        let human_outbound = event.is_human_outbound();
        let trigger = if human_outbound && location.handoff_mode.auto_handoff() {
            StatusTrigger::HumanOutboundObserved
        } else {
            StatusTrigger::MessageObserved
        };

        let now = Utc::now();
        let patch = ConversationPatch {
            contact_id: event.contact_id.clone(),
            title: event.contact_name.clone(),
            status: trigger.unconditional(),
            assigned_user_id: event.user_id.clone().filter(|_| human_outbound),
            channel: Some(event.channel.clone()).filter(|channel| channel != UNKNOWN),
            last_message_at: Some(now),
            ..Default::default()
        };
        let conversation = self
            .conversations
            .upsert_conversation(conversation_id, location_id, &patch, now)
            .await?;

        if let Some(message_id) = &event.message_id {
            self.messages
                .save_message(NewMessage {
                    id: message_id.clone(),
                    conversation_id: conversation.id.clone(),
                    direction: event.message_direction(),
                    channel: event.channel.clone(),
                    author_type: event.author_type(),
                    sender_name: Some(event.display_sender()),
                    text: event.text.clone(),
                    media_url: event.media_url.clone(),
                    meta: json!({
                        "eventType": event.event_type,
                        "payload": payload,
                    }),
                    created_at: now,
                })
                .await?;
        }

        info!(
            "CRM webhook processed: event_type={:?} conversation_id={} message_id={:?} location_id={} status={}",
            event.event_type,
            conversation.id,
            event.message_id,
            location_id,
            conversation.status.as_str()
        );

        Ok(WebhookOutcome::Processed {
            conversation_id: conversation.id,
            message_id: event.message_id,
        })
    }

    async fn demo_turn(
        &self,
        location_id: &str,
        conversation_id: Option<String>,
        text: &str,
    ) -> Result<DemoTurn, ServiceError> {
        Self::require_text(text)?;
        let location = self.require_location(location_id).await?;
        if !location.demo_enabled {
            return Err(ServiceError::ChannelDisabled("demo channel"));
        }

        let existing = match conversation_id.as_deref() {
            Some(id) => self.conversations.get_conversation(id).await?,
            None => None,
        };
        if existing.as_ref().is_some_and(|c| c.location_id != location.id) {
            return Err(ServiceError::NotFound("conversation"));
        }

        let conversation_id = conversation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();
        let patch = if existing.is_some() {
            ConversationPatch {
                last_message_at: Some(now),
                ..Default::default()
            }
        } else {
            ConversationPatch {
                title: Some(format!(
                    "Demo {}",
                    location.alias.as_deref().unwrap_or(&location.id)
                )),
                channel: Some(WEB_CHANNEL.to_owned()),
                is_demo: Some(true),
                last_message_at: Some(now),
                ..Default::default()
            }
        };
        let conversation = self
            .conversations
            .upsert_conversation(&conversation_id, &location.id, &patch, now)
            .await?;

        // The customer message is durable before the assistant is consulted.
        let inbound = self
            .messages
            .save_message(NewMessage {
                id: Uuid::new_v4().to_string(),
                conversation_id: conversation.id.clone(),
                direction: Direction::Inbound,
                channel: WEB_CHANNEL.to_owned(),
                author_type: AuthorType::Customer,
                sender_name: Some("Client".to_owned()),
                text: Some(text.to_owned()),
                media_url: None,
                meta: json!({ "source": "playground" }),
                created_at: now,
            })
            .await?;

        if !location.bot_enabled || conversation.status != ConversationStatus::Open {
            debug!(
                "no bot reply for conversation {} (bot_enabled={}, status={})",
                conversation.id,
                location.bot_enabled,
                conversation.status.as_str()
            );
            let messages = self
                .messages
                .list_conversation_messages(&conversation.id)
                .await?;
            return Ok(DemoTurn {
                conversation_id: conversation.id,
                messages,
            });
        }

        let history: Vec<Message> = self
            .messages
            .list_conversation_messages(&conversation.id)
            .await?
            .into_iter()
            .filter(|message| message.id != inbound.id)
            .collect();
        let (reply, reply_status) = self.answer(&location, &history, text).await;

        let replied_at = Utc::now();
        self.messages
            .save_message(NewMessage {
                id: Uuid::new_v4().to_string(),
                conversation_id: conversation.id.clone(),
                direction: Direction::Outbound,
                channel: WEB_CHANNEL.to_owned(),
                author_type: AuthorType::Bot,
                sender_name: Some(location.bot_name.clone()),
                text: Some(reply),
                media_url: None,
                meta: json!({ "source": "playground", "replyStatus": reply_status }),
                created_at: replied_at,
            })
            .await?;

        let touch = ConversationPatch {
            last_message_at: Some(replied_at),
            ..Default::default()
        };
        self.conversations
            .upsert_conversation(&conversation.id, &location.id, &touch, replied_at)
            .await?;

        let messages = self
            .messages
            .list_conversation_messages(&conversation.id)
            .await?;
        Ok(DemoTurn {
            conversation_id: conversation.id,
            messages,
        })
    }

    async fn agent_reply(
        &self,
        conversation_id: &str,
        text: &str,
        sender_name: Option<&str>,
    ) -> Result<Vec<Message>, ServiceError> {
        Self::require_text(text)?;
        let conversation = self
            .conversations
            .get_conversation(conversation_id)
            .await?
            .ok_or(ServiceError::NotFound("conversation"))?;
        let location = self.require_location(&conversation.location_id).await?;

        let now = Utc::now();
        self.messages
            .save_message(NewMessage {
                id: Uuid::new_v4().to_string(),
                conversation_id: conversation.id.clone(),
                direction: Direction::Outbound,
                channel: conversation
                    .channel
                    .clone()
                    .unwrap_or_else(|| WEB_CHANNEL.to_owned()),
                author_type: AuthorType::Human,
                sender_name: Some(
                    sender_name
                        .filter(|name| !name.trim().is_empty())
                        .unwrap_or("Agent")
                        .to_owned(),
                ),
                text: Some(text.to_owned()),
                media_url: None,
                meta: json!({ "source": "agent_console" }),
                created_at: now,
            })
            .await?;

        let trigger = if location.handoff_mode.auto_handoff() {
            StatusTrigger::AgentReplied
        } else {
            StatusTrigger::MessageObserved
        };
        let patch = ConversationPatch {
            status: trigger.unconditional(),
            last_message_at: Some(now),
            ..Default::default()
        };
        let updated = self
            .conversations
            .upsert_conversation(&conversation.id, &conversation.location_id, &patch, now)
            .await?;
        info!(
            "agent replied on conversation {} (status {})",
            updated.id,
            updated.status.as_str()
        );

        Ok(self
            .messages
            .list_conversation_messages(&conversation.id)
            .await?)
    }
}
