//! Normalization of CRM webhook events.
//!
//! The CRM moves fields between the top level and the `data`, `payload` and `message`
//! envelopes from one release to the next, so every field is looked up through an
//! ordered list of candidate paths.

use crate::core::extract::first_string;
use crate::infrastructure::entities::{AuthorType, Direction};
use serde_json::Value;

const EVENT_TYPE_PATHS: &[&str] = &["type", "event", "eventType", "name", "data.type", "data.event"];
const CONVERSATION_ID_PATHS: &[&str] = &[
    "conversationId",
    "data.conversationId",
    "conversation.id",
    "payload.conversation.id",
];
const MESSAGE_ID_PATHS: &[&str] = &["messageId", "data.messageId", "message.id", "payload.message.id"];
const LOCATION_ID_PATHS: &[&str] = &["locationId", "data.locationId", "location.id", "payload.location.id"];
const CONTACT_ID_PATHS: &[&str] = &["contactId", "data.contactId", "contact.id", "payload.contact.id"];
const CONTACT_NAME_PATHS: &[&str] = &["contact.name", "data.contact.name", "payload.contact.name"];
const DIRECTION_PATHS: &[&str] = &["direction", "data.direction", "message.direction"];
const CHANNEL_PATHS: &[&str] = &["channel", "data.channel", "message.channel", "data.message.channel"];
const TEXT_PATHS: &[&str] = &[
    "body",
    "message.body",
    "message.text",
    "data.body",
    "data.message.body",
];
const MEDIA_URL_PATHS: &[&str] = &[
    "attachments.0",
    "message.attachments.0",
    "data.attachments.0",
    "mediaUrl",
    "message.mediaUrl",
];
const USER_ID_PATHS: &[&str] = &["userId", "data.userId", "message.userId", "data.message.userId"];
const SENDER_NAME_PATHS: &[&str] = &[
    "contact.name",
    "data.contact.name",
    "message.senderName",
    "data.message.senderName",
];

pub const UNKNOWN: &str = "unknown";

/// Typed view over one webhook delivery. Absent fields stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub event_type: Option<String>,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub location_id: Option<String>,
    pub contact_id: Option<String>,
    pub contact_name: Option<String>,
    /// Raw direction as sent, `"unknown"` when absent.
    pub direction: String,
    pub channel: String,
    pub text: Option<String>,
    pub media_url: Option<String>,
    /// Identifier of the CRM user (a human agent) that authored the message.
    pub user_id: Option<String>,
    pub sender_name: Option<String>,
}

impl WebhookEvent {
    pub fn from_payload(payload: &Value) -> WebhookEvent {
        WebhookEvent {
            event_type: first_string(payload, EVENT_TYPE_PATHS),
            conversation_id: first_string(payload, CONVERSATION_ID_PATHS),
            message_id: first_string(payload, MESSAGE_ID_PATHS),
            location_id: first_string(payload, LOCATION_ID_PATHS),
            contact_id: first_string(payload, CONTACT_ID_PATHS),
            contact_name: first_string(payload, CONTACT_NAME_PATHS),
            direction: first_string(payload, DIRECTION_PATHS).unwrap_or_else(|| UNKNOWN.to_owned()),
            channel: first_string(payload, CHANNEL_PATHS).unwrap_or_else(|| UNKNOWN.to_owned()),
            text: first_string(payload, TEXT_PATHS),
            media_url: first_string(payload, MEDIA_URL_PATHS),
            user_id: first_string(payload, USER_ID_PATHS),
            sender_name: first_string(payload, SENDER_NAME_PATHS),
        }
    }

    /// Human-authored outbound: a CRM user is attached and the direction is outbound.
    pub fn is_human_outbound(&self) -> bool {
        self.user_id.is_some() && self.direction.eq_ignore_ascii_case("outbound")
    }

    pub fn author_type(&self) -> AuthorType {
        if self.is_human_outbound() {
            AuthorType::Human
        } else {
            AuthorType::Customer
        }
    }

    pub fn message_direction(&self) -> Direction {
        if self.direction.eq_ignore_ascii_case("outbound") {
            Direction::Outbound
        } else {
            Direction::Inbound
        }
    }

    pub fn display_sender(&self) -> String {
        match (self.is_human_outbound(), &self.user_id, &self.sender_name) {
            (true, Some(user_id), _) => user_id.clone(),
            (true, None, _) => "Agent".to_owned(),
            (false, _, Some(name)) => name.clone(),
            (false, _, None) => "Customer".to_owned(),
        }
    }

    /// Conversation and owning location, when both resolved.
    pub fn attribution(&self) -> Option<(&str, &str)> {
        Some((self.conversation_id.as_deref()?, self.location_id.as_deref()?))
    }
}
