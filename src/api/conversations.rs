//! Conversations endpoints

use crate::api::Ack;
use crate::api::conversations::schemas::{
    AgentMessageResponse, CaseCodeResponse, ConversationMessages, CreateAgentMessage,
};
use crate::core::traits::{ConversationService, IngestionCoordinator};
use crate::error::ServiceError;
use axum::extract::Path;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/:id/messages", get(conversation_messages))
        .route("/:id/agent-message", post(agent_message))
        .route("/:id/close", post(close_conversation))
        .route("/:id/reopen", post(reopen_conversation))
        .route("/:id/handoff", post(handoff_conversation))
        .route("/:id/case-code", post(case_code))
}

async fn conversation_messages(
    Inject(conversation_service): Inject<dyn ConversationService>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationMessages>, ServiceError> {
    let conversation = conversation_service
        .get_conversation(&conversation_id)
        .await?;
    let messages = conversation_service.list_messages(&conversation_id).await?;

    Ok(Json(ConversationMessages {
        conversation: conversation.into(),
        messages: messages.into_iter().map(schemas::Message::from).collect(),
    }))
}

async fn agent_message(
    Inject(coordinator): Inject<dyn IngestionCoordinator>,
    Path(conversation_id): Path<String>,
    Json(body): Json<CreateAgentMessage>,
) -> Result<Json<AgentMessageResponse>, ServiceError> {
    let messages = coordinator
        .agent_reply(&conversation_id, &body.text, body.sender_name.as_deref())
        .await?;

    Ok(Json(AgentMessageResponse {
        ok: true,
        messages: messages.into_iter().map(schemas::Message::from).collect(),
    }))
}

async fn close_conversation(
    Inject(conversation_service): Inject<dyn ConversationService>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Ack>, ServiceError> {
    conversation_service.close(&conversation_id).await?;
    Ok(Ack::ok())
}

async fn reopen_conversation(
    Inject(conversation_service): Inject<dyn ConversationService>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Ack>, ServiceError> {
    conversation_service.reopen(&conversation_id).await?;
    Ok(Ack::ok())
}

async fn handoff_conversation(
    Inject(conversation_service): Inject<dyn ConversationService>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Ack>, ServiceError> {
    conversation_service.handoff(&conversation_id).await?;
    Ok(Ack::ok())
}

async fn case_code(
    Inject(conversation_service): Inject<dyn ConversationService>,
    Path(conversation_id): Path<String>,
) -> Result<Json<CaseCodeResponse>, ServiceError> {
    let case_code = conversation_service.case_code(&conversation_id).await?;
    Ok(Json(CaseCodeResponse { case_code }))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Conversation {
        pub id: String,
        pub location_id: String,
        pub title: Option<String>,
        pub status: entities::ConversationStatus,
        pub channel: Option<String>,
        /// `"demo"` for sandbox conversations, `"crm"` otherwise.
        pub source: &'static str,
        pub case_code: Option<String>,
        pub last_message_at: Option<DateTime<Utc>>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::Conversation> for Conversation {
        fn from(conversation: entities::Conversation) -> Self {
            Conversation {
                id: conversation.id,
                location_id: conversation.location_id,
                title: conversation.title,
                status: conversation.status,
                channel: conversation.channel,
                source: if conversation.is_demo { "demo" } else { "crm" },
                case_code: conversation.case_code,
                last_message_at: conversation.last_message_at,
                updated_at: conversation.updated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Message {
        pub id: String,
        pub author_type: entities::AuthorType,
        pub direction: entities::Direction,
        pub text: Option<String>,
        pub sender_name: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Message> for Message {
        fn from(message: entities::Message) -> Self {
            Message {
                id: message.id,
                author_type: message.author_type,
                direction: message.direction,
                text: message.text,
                sender_name: message.sender_name,
                created_at: message.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ConversationList {
        pub conversations: Vec<Conversation>,
    }

    #[derive(Serialize, Debug)]
    pub struct ConversationMessages {
        pub conversation: Conversation,
        pub messages: Vec<Message>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateAgentMessage {
        pub text: String,
        pub sender_name: Option<String>,
    }

    #[derive(Serialize, Debug)]
    pub struct AgentMessageResponse {
        pub ok: bool,
        pub messages: Vec<Message>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct CaseCodeResponse {
        pub case_code: String,
    }
}
