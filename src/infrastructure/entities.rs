//! Database entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum HandoffMode {
    OnHumanReply,
    ManualOnly,
}

impl HandoffMode {
    /// Whether an observed human reply moves the conversation into handoff by itself.
    pub fn auto_handoff(self) -> bool {
        matches!(self, HandoffMode::OnHumanReply)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Location {
    pub id: String,
    pub alias: Option<String>,
    pub public_key: String,
    pub bot_name: String,
    pub system_prompt: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub bot_enabled: bool,
    pub demo_enabled: bool,
    pub handoff_mode: HandoffMode,
    pub support_email: Option<String>,
    pub support_whatsapp: Option<String>,
    pub theme_color: String,
    pub crm_api_key: Option<String>,
    pub agency_location_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sparse set of location fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPatch {
    pub alias: Option<String>,
    pub bot_name: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(rename = "openaiModel")]
    pub model: Option<String>,
    #[serde(rename = "openaiTemperature")]
    pub temperature: Option<f64>,
    pub bot_enabled: Option<bool>,
    pub demo_enabled: Option<bool>,
    pub handoff_mode: Option<HandoffMode>,
    pub support_email: Option<String>,
    pub support_whatsapp: Option<String>,
    pub theme_color: Option<String>,
    #[serde(rename = "ghlApiKey")]
    pub crm_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Handoff,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversationStatus::Open => "open",
            ConversationStatus::Handoff => "handoff",
            ConversationStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: String,
    pub location_id: String,
    pub contact_id: Option<String>,
    pub title: Option<String>,
    pub status: ConversationStatus,
    pub assigned_user_id: Option<String>,
    pub channel: Option<String>,
    pub case_code: Option<String>,
    pub is_demo: bool,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sparse set of conversation fields for an upsert.
///
/// Only fields that are `Some` are written on an existing row. On creation, a missing
/// `status` defaults to open and a missing `is_demo` to false. The owning location is
/// only ever set on creation, and a case code is only written while none is stored.
#[derive(Debug, Clone, Default)]
pub struct ConversationPatch {
    pub contact_id: Option<String>,
    pub title: Option<String>,
    pub status: Option<ConversationStatus>,
    pub assigned_user_id: Option<String>,
    pub channel: Option<String>,
    pub case_code: Option<String>,
    pub is_demo: Option<bool>,
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AuthorType {
    Customer,
    Bot,
    Human,
}

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub direction: Direction,
    pub channel: String,
    pub author_type: AuthorType,
    pub sender_name: Option<String>,
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub meta: Json<Value>,
    pub created_at: DateTime<Utc>,
}

/// A message as handed to the message store. `id` is the idempotency key.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: String,
    pub conversation_id: String,
    pub direction: Direction,
    pub channel: String,
    pub author_type: AuthorType,
    pub sender_name: Option<String>,
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct StatusCounts {
    pub open: i64,
    pub handoff: i64,
    pub closed: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.open + self.handoff + self.closed
    }
}
