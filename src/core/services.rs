//! Implementations for the service the app needs.
//!

use crate::config::AppConfig;
use crate::core::lifecycle::StatusTrigger;
use crate::core::traits::{
    CompletionStatus, ConversationService, CrmStatus, DashboardSummary, IntegrationStatus,
    LocationService, LocationStats, SummaryService,
};
use crate::error::ServiceError;
use crate::infrastructure::entities::{Conversation, Location, LocationPatch, Message};
use crate::infrastructure::traits::{
    CompletionClient, ConversationRepository, CrmStatusClient, LocationRepository,
    MessageRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::{info, warn};
use rand::Rng;
use uuid::Uuid;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const CASE_CODE_ATTEMPTS: usize = 3;

/// Listed when the completion service cannot be asked for its models.
pub const FALLBACK_MODELS: [&str; 4] = ["gpt-4.1-mini", "gpt-4.1", "gpt-4o-mini", "gpt-4o"];

fn base36(digit: u64) -> char {
    BASE36[(digit % 36) as usize] as char
}

/// `CASE-` followed by four random and two time-derived base-36 characters.
pub fn generate_case_code() -> String {
    let mut rng = rand::rng();
    let random: String = (0..4).map(|_| base36(rng.random_range(0..36))).collect();
    let millis = Utc::now().timestamp_millis().unsigned_abs();

    format!("CASE-{random}{}{}", base36(millis / 36), base36(millis))
}

#[injectable(ConversationService)]
pub struct InboxConversationService {
    conversations: Ref<dyn ConversationRepository>,
    messages: Ref<dyn MessageRepository>,
}

#[async_trait]
impl ConversationService for InboxConversationService {
    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, ServiceError> {
        self.conversations
            .get_conversation(conversation_id)
            .await?
            .ok_or(ServiceError::NotFound("conversation"))
    }

    async fn list_conversations(&self, location_id: &str) -> Result<Vec<Conversation>, ServiceError> {
        Ok(self
            .conversations
            .list_location_conversations(location_id, None)
            .await?)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ServiceError> {
        Ok(self
            .messages
            .list_conversation_messages(conversation_id)
            .await?)
    }

    async fn apply_action(
        &self,
        conversation_id: &str,
        trigger: StatusTrigger,
    ) -> Result<Conversation, ServiceError> {
        let Some((from, to)) = trigger.transition() else {
            return self.get_conversation(conversation_id).await;
        };

        // Precondition and write are one statement.
        match self
            .conversations
            .transition_status(conversation_id, from, to, Utc::now())
            .await?
        {
            Some(conversation) => {
                info!(
                    "conversation {conversation_id} -> {} ({trigger:?})",
                    conversation.status.as_str()
                );
                Ok(conversation)
            }
            None => self.get_conversation(conversation_id).await,
        }
    }

    async fn case_code(&self, conversation_id: &str) -> Result<String, ServiceError> {
        let conversation = self.get_conversation(conversation_id).await?;
        if let Some(code) = conversation.case_code {
            return Ok(code);
        }

        let mut attempt = 1;
        loop {
            match self
                .conversations
                .assign_case_code(conversation_id, &generate_case_code())
                .await
            {
                Ok(Some(code)) => return Ok(code),
                Ok(None) => return Err(ServiceError::NotFound("conversation")),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() && attempt < CASE_CODE_ATTEMPTS => {
                    warn!("case code collision on conversation {conversation_id}, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[injectable(LocationService)]
pub struct InboxLocationService {
    config: Ref<AppConfig>,
    locations: Ref<dyn LocationRepository>,
    completion: Ref<dyn CompletionClient>,
    crm: Ref<dyn CrmStatusClient>,
}

impl InboxLocationService {
    fn validate(patch: &LocationPatch) -> Result<(), ServiceError> {
        if let Some(temperature) = patch.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ServiceError::InvalidInput(format!(
                    "temperature must be between 0 and 2, got {temperature}"
                )));
            }
        }
        if patch.bot_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ServiceError::InvalidInput("bot name must not be empty".to_owned()));
        }
        Ok(())
    }

    async fn completion_status(&self) -> CompletionStatus {
        let fallback = || FALLBACK_MODELS.iter().map(|m| (*m).to_owned()).collect::<Vec<_>>();

        if !self.config.completion_configured() {
            return CompletionStatus {
                configured: false,
                connected: false,
                models: fallback(),
                detail: Some("OPENAI_API_KEY is missing".to_owned()),
            };
        }

        match self.completion.list_models().await {
            Ok(models) => CompletionStatus {
                configured: true,
                connected: true,
                models: if models.is_empty() { fallback() } else { models },
                detail: None,
            },
            Err(e) => CompletionStatus {
                configured: true,
                connected: false,
                models: fallback(),
                detail: Some(e.to_string()),
            },
        }
    }

    async fn crm_status(&self, location: &Location) -> CrmStatus {
        let Some(api_key) = location.crm_api_key.as_deref().filter(|key| !key.is_empty()) else {
            return CrmStatus {
                configured: false,
                connected: false,
                detail: Some("Location GHL API key missing".to_owned()),
            };
        };

        match self.crm.check_location(&location.id, api_key).await {
            Ok(()) => CrmStatus {
                configured: true,
                connected: true,
                detail: None,
            },
            Err(e) => CrmStatus {
                configured: true,
                connected: false,
                detail: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
impl LocationService for InboxLocationService {
    async fn list_locations(&self) -> Result<Vec<Location>, ServiceError> {
        Ok(self.locations.list_locations().await?)
    }

    async fn get_location(&self, location_id: &str) -> Result<Location, ServiceError> {
        self.locations
            .get_location(location_id)
            .await?
            .ok_or(ServiceError::NotFound("location"))
    }

    async fn get_location_by_public_key(&self, public_key: &str) -> Result<Location, ServiceError> {
        self.locations
            .get_location_by_public_key(public_key)
            .await?
            .ok_or(ServiceError::NotFound("location"))
    }

    async fn upsert_location(
        &self,
        location_id: &str,
        patch: LocationPatch,
    ) -> Result<Location, ServiceError> {
        if location_id.trim().is_empty() {
            return Err(ServiceError::InvalidInput("locationId must not be empty".to_owned()));
        }
        Self::validate(&patch)?;

        let mut public_key = Uuid::new_v4().simple().to_string();
        public_key.truncate(24);

        let location = self
            .locations
            .upsert_location(
                location_id,
                &public_key,
                self.config.master_location_id.as_deref(),
                &patch,
            )
            .await?;
        info!("location {} saved", location.id);
        Ok(location)
    }

    async fn update_settings(
        &self,
        location_id: &str,
        patch: LocationPatch,
    ) -> Result<Location, ServiceError> {
        Self::validate(&patch)?;

        self.locations
            .update_location(location_id, &patch)
            .await?
            .ok_or(ServiceError::NotFound("location"))
    }

    async fn integration_status(&self, location_id: &str) -> Result<IntegrationStatus, ServiceError> {
        let location = self.get_location(location_id).await?;
        let (completion, crm) = tokio::join!(self.completion_status(), self.crm_status(&location));

        Ok(IntegrationStatus { completion, crm })
    }
}

#[injectable(SummaryService)]
pub struct InboxSummaryService {
    locations: Ref<dyn LocationRepository>,
    conversations: Ref<dyn ConversationRepository>,
    messages: Ref<dyn MessageRepository>,
}

#[async_trait]
impl SummaryService for InboxSummaryService {
    async fn dashboard_summary(&self) -> Result<DashboardSummary, ServiceError> {
        let locations = self.locations.count_locations().await?;
        let counts = self.conversations.status_counts(None).await?;
        let messages = self.messages.count_messages().await?;

        Ok(DashboardSummary {
            locations,
            conversations: counts.total(),
            open_conversations: counts.open,
            handoff_conversations: counts.handoff,
            closed_conversations: counts.closed,
            messages,
        })
    }

    async fn location_stats(&self, location_id: &str) -> Result<LocationStats, ServiceError> {
        let counts = self.conversations.status_counts(Some(location_id)).await?;

        Ok(LocationStats {
            open_conversations: counts.open + counts.handoff,
            handoff_conversations: counts.handoff,
        })
    }
}
