//! Infrastructure traits, used for DI on higher levels

use crate::core::assistant::ChatMessage;
use crate::error::{CompletionError, CrmError};
use crate::infrastructure::entities;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn get_location(&self, id: &str) -> Result<Option<entities::Location>, sqlx::Error>;

    async fn get_location_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<Option<entities::Location>, sqlx::Error>;

    /// Newest first.
    async fn list_locations(&self) -> Result<Vec<entities::Location>, sqlx::Error>;

    /// Creates the location if absent, else writes only the fields present in `patch`.
    ///
    /// `public_key` and `agency_location_id` are only used when the row is created.
    async fn upsert_location(
        &self,
        id: &str,
        public_key: &str,
        agency_location_id: Option<&str>,
        patch: &entities::LocationPatch,
    ) -> Result<entities::Location, sqlx::Error>;

    /// Writes the fields present in `patch`. Returns `None` if the location does not exist.
    async fn update_location(
        &self,
        id: &str,
        patch: &entities::LocationPatch,
    ) -> Result<Option<entities::Location>, sqlx::Error>;

    async fn count_locations(&self) -> Result<i64, sqlx::Error>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn get_conversation(
        &self,
        id: &str,
    ) -> Result<Option<entities::Conversation>, sqlx::Error>;

    /// Field-level merge keyed by `id`, see [`entities::ConversationPatch`].
    async fn upsert_conversation(
        &self,
        id: &str,
        location_id: &str,
        patch: &entities::ConversationPatch,
        now: DateTime<Utc>,
    ) -> Result<entities::Conversation, sqlx::Error>;

    /// Moves the conversation to `to` if its stored status is one of `from`, in one statement.
    ///
    /// Returns `None` when the conversation does not exist or its status is not in `from`.
    async fn transition_status(
        &self,
        id: &str,
        from: &[entities::ConversationStatus],
        to: entities::ConversationStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<entities::Conversation>, sqlx::Error>;

    /// Most recently active first.
    async fn list_location_conversations(
        &self,
        location_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<entities::Conversation>, sqlx::Error>;

    /// Stores `case_code` unless one is already assigned, and returns the stored code.
    async fn assign_case_code(
        &self,
        id: &str,
        case_code: &str,
    ) -> Result<Option<String>, sqlx::Error>;

    /// Counts non-demo conversations, optionally for one location.
    async fn status_counts(
        &self,
        location_id: Option<&str>,
    ) -> Result<entities::StatusCounts, sqlx::Error>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Upsert keyed by the message id. The owning conversation and the creation time of an
    /// existing row never change.
    async fn save_message(
        &self,
        message: entities::NewMessage,
    ) -> Result<entities::Message, sqlx::Error>;

    /// Chronological order.
    async fn list_conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<entities::Message>, sqlx::Error>;

    /// Counts messages of non-demo conversations.
    async fn count_messages(&self) -> Result<i64, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f64,
    pub messages: Vec<ChatMessage>,
}

/// External text-completion capability.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;

    async fn list_models(&self) -> Result<Vec<String>, CompletionError>;
}

/// Reachability and credential check against the external CRM.
#[async_trait]
pub trait CrmStatusClient: Send + Sync {
    async fn check_location(&self, location_id: &str, api_key: &str) -> Result<(), CrmError>;
}
