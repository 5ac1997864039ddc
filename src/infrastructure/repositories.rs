//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Conversation, ConversationPatch, ConversationStatus, Location, LocationPatch, Message,
    NewMessage, StatusCounts,
};
use crate::infrastructure::traits::{
    ConversationRepository, LocationRepository, MessageRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use sqlx::{QueryBuilder, Sqlite};
use sqlx::query::QueryAs;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;

type LocationQuery<'q> = QueryAs<'q, Sqlite, Location, SqliteArguments<'q>>;

/// Binds the patch fields in declaration order.
fn bind_location_patch<'q>(query: LocationQuery<'q>, patch: &'q LocationPatch) -> LocationQuery<'q> {
    query
        .bind(patch.alias.as_deref())
        .bind(patch.bot_name.as_deref())
        .bind(patch.system_prompt.as_deref())
        .bind(patch.model.as_deref())
        .bind(patch.temperature)
        .bind(patch.bot_enabled)
        .bind(patch.demo_enabled)
        .bind(patch.handoff_mode)
        .bind(patch.support_email.as_deref())
        .bind(patch.support_whatsapp.as_deref())
        .bind(patch.theme_color.as_deref())
        .bind(patch.crm_api_key.as_deref())
}

#[injectable(LocationRepository)]
pub struct DbLocationRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl LocationRepository for DbLocationRepository {
    async fn get_location(&self, id: &str) -> Result<Option<Location>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM locations WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn get_location_by_public_key(
        &self,
        public_key: &str,
    ) -> Result<Option<Location>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM locations WHERE public_key = ?")
            .bind(public_key)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn list_locations(&self) -> Result<Vec<Location>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM locations ORDER BY created_at DESC, rowid DESC")
            .fetch_all(&**self.connection)
            .await
    }

    async fn upsert_location(
        &self,
        id: &str,
        public_key: &str,
        agency_location_id: Option<&str>,
        patch: &LocationPatch,
    ) -> Result<Location, sqlx::Error> {
        let query = sqlx::query_as(
            "INSERT INTO locations (id, alias, public_key, bot_name, system_prompt, model, temperature, bot_enabled, demo_enabled, handoff_mode, support_email, support_whatsapp, theme_color, crm_api_key, agency_location_id, created_at, updated_at) \
             VALUES (?1, ?5, ?2, COALESCE(?6, 'Rushingbot'), ?7, COALESCE(?8, 'gpt-4.1-mini'), COALESCE(?9, 0.2), COALESCE(?10, 1), COALESCE(?11, 1), COALESCE(?12, 'on_human_reply'), ?13, ?14, COALESCE(?15, '#2f5bff'), ?16, ?3, ?4, ?4) \
             ON CONFLICT(id) DO UPDATE SET \
                alias = COALESCE(?5, alias), \
                bot_name = COALESCE(?6, bot_name), \
                system_prompt = COALESCE(?7, system_prompt), \
                model = COALESCE(?8, model), \
                temperature = COALESCE(?9, temperature), \
                bot_enabled = COALESCE(?10, bot_enabled), \
                demo_enabled = COALESCE(?11, demo_enabled), \
                handoff_mode = COALESCE(?12, handoff_mode), \
                support_email = COALESCE(?13, support_email), \
                support_whatsapp = COALESCE(?14, support_whatsapp), \
                theme_color = COALESCE(?15, theme_color), \
                crm_api_key = COALESCE(?16, crm_api_key), \
                updated_at = ?4 \
             RETURNING *",
        )
        .bind(id)
        .bind(public_key)
        .bind(agency_location_id)
        .bind(Utc::now());

        bind_location_patch(query, patch)
            .fetch_one(&**self.connection)
            .await
    }

    async fn update_location(
        &self,
        id: &str,
        patch: &LocationPatch,
    ) -> Result<Option<Location>, sqlx::Error> {
        let query = sqlx::query_as(
            "UPDATE locations SET \
                alias = COALESCE(?3, alias), \
                bot_name = COALESCE(?4, bot_name), \
                system_prompt = COALESCE(?5, system_prompt), \
                model = COALESCE(?6, model), \
                temperature = COALESCE(?7, temperature), \
                bot_enabled = COALESCE(?8, bot_enabled), \
                demo_enabled = COALESCE(?9, demo_enabled), \
                handoff_mode = COALESCE(?10, handoff_mode), \
                support_email = COALESCE(?11, support_email), \
                support_whatsapp = COALESCE(?12, support_whatsapp), \
                theme_color = COALESCE(?13, theme_color), \
                crm_api_key = COALESCE(?14, crm_api_key), \
                updated_at = ?2 \
             WHERE id = ?1 \
             RETURNING *",
        )
        .bind(id)
        .bind(Utc::now());

        bind_location_patch(query, patch)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn count_locations(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&**self.connection)
            .await
    }
}

#[injectable(ConversationRepository)]
pub struct DbConversationRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbConversationRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> DbConversationRepository {
        DbConversationRepository { connection }
    }
}

#[async_trait]
impl ConversationRepository for DbConversationRepository {
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn upsert_conversation(
        &self,
        id: &str,
        location_id: &str,
        patch: &ConversationPatch,
        now: DateTime<Utc>,
    ) -> Result<Conversation, sqlx::Error> {
        // One statement, so concurrent partial updates of the same row merge field by field.
        sqlx::query_as(
            "INSERT INTO conversations (id, location_id, contact_id, title, status, assigned_user_id, channel, case_code, is_demo, last_message_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 'open'), ?6, ?7, ?8, COALESCE(?9, 0), ?10, ?11, ?11) \
             ON CONFLICT(id) DO UPDATE SET \
                contact_id = COALESCE(?3, contact_id), \
                title = COALESCE(?4, title), \
                status = COALESCE(?5, status), \
                assigned_user_id = COALESCE(?6, assigned_user_id), \
                channel = COALESCE(?7, channel), \
                case_code = COALESCE(case_code, ?8), \
                is_demo = COALESCE(?9, is_demo), \
                last_message_at = COALESCE(?10, last_message_at), \
                updated_at = ?11 \
             RETURNING *",
        )
        .bind(id)
        .bind(location_id)
        .bind(patch.contact_id.as_deref())
        .bind(patch.title.as_deref())
        .bind(patch.status)
        .bind(patch.assigned_user_id.as_deref())
        .bind(patch.channel.as_deref())
        .bind(patch.case_code.as_deref())
        .bind(patch.is_demo)
        .bind(patch.last_message_at)
        .bind(now)
        .fetch_one(&**self.connection)
        .await
    }

    async fn transition_status(
        &self,
        id: &str,
        from: &[ConversationStatus],
        to: ConversationStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        if from.is_empty() {
            return Ok(None);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE conversations SET status = ");
        query
            .push_bind(to)
            .push(", updated_at = ")
            .push_bind(now)
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND status IN (");
        let mut statuses = query.separated(", ");
        for status in from {
            statuses.push_bind(*status);
        }
        statuses.push_unseparated(") RETURNING *");

        query
            .build_query_as::<Conversation>()
            .fetch_optional(&**self.connection)
            .await
    }

    async fn list_location_conversations(
        &self,
        location_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Conversation>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM conversations WHERE location_id = ?1 \
             ORDER BY COALESCE(last_message_at, updated_at) DESC, rowid DESC \
             LIMIT COALESCE(?2, -1)",
        )
        .bind(location_id)
        .bind(limit)
        .fetch_all(&**self.connection)
        .await
    }

    async fn assign_case_code(
        &self,
        id: &str,
        case_code: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE conversations SET case_code = COALESCE(case_code, ?2), updated_at = ?3 \
             WHERE id = ?1 RETURNING case_code",
        )
        .bind(id)
        .bind(case_code)
        .bind(Utc::now())
        .fetch_optional(&**self.connection)
        .await
    }

    async fn status_counts(&self, location_id: Option<&str>) -> Result<StatusCounts, sqlx::Error> {
        sqlx::query_as(
            "SELECT \
                COALESCE(SUM(status = 'open'), 0) AS open, \
                COALESCE(SUM(status = 'handoff'), 0) AS handoff, \
                COALESCE(SUM(status = 'closed'), 0) AS closed \
             FROM conversations \
             WHERE is_demo = 0 AND (?1 IS NULL OR location_id = ?1)",
        )
        .bind(location_id)
        .fetch_one(&**self.connection)
        .await
    }
}

#[injectable(MessageRepository)]
pub struct DbMessageRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl MessageRepository for DbMessageRepository {
    async fn save_message(&self, message: NewMessage) -> Result<Message, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO messages (id, conversation_id, direction, channel, author_type, sender_name, text, media_url, meta, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(id) DO UPDATE SET \
                direction = excluded.direction, \
                channel = excluded.channel, \
                author_type = excluded.author_type, \
                sender_name = excluded.sender_name, \
                text = excluded.text, \
                media_url = excluded.media_url, \
                meta = excluded.meta \
             RETURNING *",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(message.direction)
        .bind(&message.channel)
        .bind(message.author_type)
        .bind(message.sender_name.as_deref())
        .bind(message.text.as_deref())
        .bind(message.media_url.as_deref())
        .bind(Json(&message.meta))
        .bind(message.created_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn list_conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&**self.connection)
        .await
    }

    async fn count_messages(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages \
             INNER JOIN conversations ON conversations.id = messages.conversation_id \
             WHERE conversations.is_demo = 0",
        )
        .fetch_one(&**self.connection)
        .await
    }
}
