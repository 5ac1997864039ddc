//! DI "Interfaces"

use crate::core::assistant::Reply;
use crate::core::lifecycle::StatusTrigger;
use crate::error::{CompletionError, ServiceError};
use crate::infrastructure::entities;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Returns `Err(NotFound)` if the conversation does not exist.
    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<entities::Conversation, ServiceError>;

    /// Lists the conversations of a location, most recently active first.
    async fn list_conversations(
        &self,
        location_id: &str,
    ) -> Result<Vec<entities::Conversation>, ServiceError>;

    /// List all messages in a conversation, oldest first.
    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<entities::Message>, ServiceError>;

    /// Applies an explicit status action.
    ///
    /// Returns `Err(NotFound)` if the conversation does not exist. Actions whose precondition
    /// does not hold leave the conversation unchanged.
    async fn apply_action(
        &self,
        conversation_id: &str,
        trigger: StatusTrigger,
    ) -> Result<entities::Conversation, ServiceError>;

    async fn close(&self, conversation_id: &str) -> Result<entities::Conversation, ServiceError> {
        self.apply_action(conversation_id, StatusTrigger::Close).await
    }

    async fn reopen(&self, conversation_id: &str) -> Result<entities::Conversation, ServiceError> {
        self.apply_action(conversation_id, StatusTrigger::Reopen).await
    }

    async fn handoff(&self, conversation_id: &str) -> Result<entities::Conversation, ServiceError> {
        self.apply_action(conversation_id, StatusTrigger::Handoff).await
    }

    /// Returns the case code of the conversation, generating one on first use.
    async fn case_code(&self, conversation_id: &str) -> Result<String, ServiceError>;
}

/// What happened to a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Stored. `message_id` is `None` when the event carried no message.
    Processed {
        conversation_id: String,
        message_id: Option<String>,
    },
    /// Logged and dropped.
    Dropped { reason: &'static str },
}

#[derive(Debug)]
pub struct DemoTurn {
    pub conversation_id: String,
    pub messages: Vec<entities::Message>,
}

/// Per-channel entry points of the ingestion pipeline.
#[async_trait]
pub trait IngestionCoordinator: Send + Sync {
    /// Normalizes and stores one CRM webhook delivery.
    ///
    /// Unattributable events are dropped, not reported as errors.
    async fn ingest_webhook(&self, payload: &Value) -> Result<WebhookOutcome, ServiceError>;

    /// Stores a customer message from the widget or the demo sandbox and answers it.
    ///
    /// A failing assistant never fails the turn; a fixed apology is stored instead.
    async fn demo_turn(
        &self,
        location_id: &str,
        conversation_id: Option<String>,
        text: &str,
    ) -> Result<DemoTurn, ServiceError>;

    /// Stores a reply written in the agent console and hands the conversation to humans.
    ///
    /// Returns the updated message list.
    async fn agent_reply(
        &self,
        conversation_id: &str,
        text: &str,
        sender_name: Option<&str>,
    ) -> Result<Vec<entities::Message>, ServiceError>;
}

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Produces the next automated response.
    ///
    /// Returns [`Reply::Unavailable`] without calling out when no completion credential is
    /// configured, and `Err` when the completion service fails.
    async fn generate(
        &self,
        location: &entities::Location,
        history: &[entities::Message],
        user_message: &str,
    ) -> Result<Reply, CompletionError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionStatus {
    pub configured: bool,
    pub connected: bool,
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrmStatus {
    pub configured: bool,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationStatus {
    pub completion: CompletionStatus,
    pub crm: CrmStatus,
}

#[async_trait]
pub trait LocationService: Send + Sync {
    async fn list_locations(&self) -> Result<Vec<entities::Location>, ServiceError>;

    /// Returns `Err(NotFound)` if the location does not exist.
    async fn get_location(&self, location_id: &str) -> Result<entities::Location, ServiceError>;

    async fn get_location_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<entities::Location, ServiceError>;

    /// Creates the location, or merges the given fields into an existing one.
    async fn upsert_location(
        &self,
        location_id: &str,
        patch: entities::LocationPatch,
    ) -> Result<entities::Location, ServiceError>;

    async fn update_settings(
        &self,
        location_id: &str,
        patch: entities::LocationPatch,
    ) -> Result<entities::Location, ServiceError>;

    async fn integration_status(
        &self,
        location_id: &str,
    ) -> Result<IntegrationStatus, ServiceError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub locations: i64,
    pub conversations: i64,
    pub open_conversations: i64,
    pub handoff_conversations: i64,
    pub closed_conversations: i64,
    pub messages: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStats {
    /// Conversations that are not closed.
    pub open_conversations: i64,
    pub handoff_conversations: i64,
}

/// Read-only rollups. Demo conversations are excluded.
#[async_trait]
pub trait SummaryService: Send + Sync {
    async fn dashboard_summary(&self) -> Result<DashboardSummary, ServiceError>;

    async fn location_stats(&self, location_id: &str) -> Result<LocationStats, ServiceError>;
}
