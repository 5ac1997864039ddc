//! Location (tenant) endpoints, the demo sandbox and the widget bootstrap lookup

use crate::api::conversations::schemas::{Conversation, ConversationList, Message};
use crate::api::locations::schemas::{
    CreateLocation, DemoMessage, DemoTurnResponse, LocationDetail, LocationEnvelope, LocationList,
    LocationView, WidgetLocation,
};
use crate::config::AppConfig;
use crate::core::traits::{
    ConversationService, IngestionCoordinator, IntegrationStatus, LocationService, SummaryService,
};
use crate::error::ServiceError;
use crate::infrastructure::entities::LocationPatch;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route("/:id", get(get_location).patch(update_location))
        .route("/:id/conversations", get(location_conversations))
        .route("/:id/demo/message", post(demo_message))
        .route("/:id/integrations", get(integrations))
}

pub fn widget_router() -> Router {
    Router::new().route("/location/:public_key", get(widget_location))
}

async fn list_locations(
    Inject(location_service): Inject<dyn LocationService>,
    Inject(config): Inject<AppConfig>,
) -> Result<Json<LocationList>, ServiceError> {
    let locations = location_service.list_locations().await?;

    Ok(Json(LocationList {
        locations: locations
            .into_iter()
            .map(|location| LocationView::new(location, &config))
            .collect(),
    }))
}

async fn create_location(
    Inject(location_service): Inject<dyn LocationService>,
    Inject(config): Inject<AppConfig>,
    Json(body): Json<CreateLocation>,
) -> Result<(StatusCode, Json<LocationEnvelope>), ServiceError> {
    let location = location_service
        .upsert_location(&body.location_id, body.settings)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LocationEnvelope {
            location: LocationView::new(location, &config),
        }),
    ))
}

async fn get_location(
    Inject(location_service): Inject<dyn LocationService>,
    Inject(summary_service): Inject<dyn SummaryService>,
    Inject(config): Inject<AppConfig>,
    Path(location_id): Path<String>,
) -> Result<Json<LocationDetail>, ServiceError> {
    let location = location_service.get_location(&location_id).await?;
    let stats = summary_service.location_stats(&location_id).await?;

    Ok(Json(LocationDetail {
        location: LocationView::new(location, &config),
        stats,
    }))
}

async fn update_location(
    Inject(location_service): Inject<dyn LocationService>,
    Inject(config): Inject<AppConfig>,
    Path(location_id): Path<String>,
    Json(patch): Json<LocationPatch>,
) -> Result<Json<LocationEnvelope>, ServiceError> {
    let location = location_service.update_settings(&location_id, patch).await?;

    Ok(Json(LocationEnvelope {
        location: LocationView::new(location, &config),
    }))
}

async fn location_conversations(
    Inject(conversation_service): Inject<dyn ConversationService>,
    Path(location_id): Path<String>,
) -> Result<Json<ConversationList>, ServiceError> {
    let conversations = conversation_service.list_conversations(&location_id).await?;

    Ok(Json(ConversationList {
        conversations: conversations.into_iter().map(Conversation::from).collect(),
    }))
}

async fn demo_message(
    Inject(coordinator): Inject<dyn IngestionCoordinator>,
    Path(location_id): Path<String>,
    Json(body): Json<DemoMessage>,
) -> Result<Json<DemoTurnResponse>, ServiceError> {
    let turn = coordinator
        .demo_turn(&location_id, body.conversation_id, &body.text)
        .await?;

    Ok(Json(DemoTurnResponse {
        conversation_id: turn.conversation_id,
        messages: turn.messages.into_iter().map(Message::from).collect(),
    }))
}

async fn integrations(
    Inject(location_service): Inject<dyn LocationService>,
    Path(location_id): Path<String>,
) -> Result<Json<IntegrationStatus>, ServiceError> {
    Ok(Json(location_service.integration_status(&location_id).await?))
}

async fn widget_location(
    Inject(location_service): Inject<dyn LocationService>,
    Path(public_key): Path<String>,
) -> Result<Json<WidgetLocation>, ServiceError> {
    let location = location_service.get_location_by_public_key(&public_key).await?;

    Ok(Json(WidgetLocation {
        location_id: location.id,
        alias: location.alias,
        bot_name: location.bot_name,
        theme_color: location.theme_color,
    }))
}

pub mod schemas {
    use crate::api::conversations::schemas::Message;
    use crate::config::AppConfig;
    use crate::core::traits::LocationStats;
    use crate::infrastructure::entities::{self, HandoffMode, LocationPatch};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    pub const MASKED_CREDENTIAL: &str = "***";

    /// A location as shown to operators. The CRM credential is masked.
    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct LocationView {
        pub id: String,
        pub alias: Option<String>,
        pub public_key: String,
        pub bot_name: String,
        pub system_prompt: Option<String>,
        pub openai_model: String,
        pub openai_temperature: f64,
        pub bot_enabled: bool,
        pub demo_enabled: bool,
        pub handoff_mode: HandoffMode,
        pub support_email: Option<String>,
        pub support_whatsapp: Option<String>,
        pub theme_color: String,
        pub ghl_api_key: Option<&'static str>,
        pub embed_code: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl LocationView {
        pub fn new(location: entities::Location, config: &AppConfig) -> LocationView {
            LocationView {
                embed_code: config.embed_code(&location.public_key),
                ghl_api_key: location
                    .crm_api_key
                    .as_ref()
                    .filter(|key| !key.is_empty())
                    .map(|_| MASKED_CREDENTIAL),
                id: location.id,
                alias: location.alias,
                public_key: location.public_key,
                bot_name: location.bot_name,
                system_prompt: location.system_prompt,
                openai_model: location.model,
                openai_temperature: location.temperature,
                bot_enabled: location.bot_enabled,
                demo_enabled: location.demo_enabled,
                handoff_mode: location.handoff_mode,
                support_email: location.support_email,
                support_whatsapp: location.support_whatsapp,
                theme_color: location.theme_color,
                created_at: location.created_at,
                updated_at: location.updated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct LocationList {
        pub locations: Vec<LocationView>,
    }

    #[derive(Serialize, Debug)]
    pub struct LocationEnvelope {
        pub location: LocationView,
    }

    #[derive(Serialize, Debug)]
    pub struct LocationDetail {
        pub location: LocationView,
        pub stats: LocationStats,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateLocation {
        pub location_id: String,
        #[serde(flatten)]
        pub settings: LocationPatch,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct DemoMessage {
        pub conversation_id: Option<String>,
        pub text: String,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct DemoTurnResponse {
        pub conversation_id: String,
        pub messages: Vec<Message>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct WidgetLocation {
        pub location_id: String,
        pub alias: Option<String>,
        pub bot_name: String,
        pub theme_color: String,
    }
}
