//! Customer-support conversation ingestion service - Library exports for testing
//!
//! Reconciles CRM webhook events, widget turns and agent console replies into one
//! timeline per conversation, and decides whether the bot or a human drives it.

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod infrastructure;

use crate::core::assistant::AssistantReplyGenerator;
use crate::core::ingestion::InboxIngestionCoordinator;
use crate::core::services::{InboxConversationService, InboxLocationService, InboxSummaryService};
use crate::infrastructure::repositories::{
    DbConversationRepository, DbLocationRepository, DbMessageRepository,
};
use di::{Injectable, ServiceCollection};

/// Registers the repositories and core services.
///
/// The caller registers `AppConfig`, the `DatabaseConnection` and the two outbound clients
/// (`CompletionClient`, `CrmStatusClient`), so tests can substitute their own.
pub fn add_core_services(services: &mut ServiceCollection) -> &mut ServiceCollection {
    services
        .add(DbLocationRepository::scoped())
        .add(DbConversationRepository::scoped())
        .add(DbMessageRepository::scoped())
        .add(AssistantReplyGenerator::scoped())
        .add(InboxConversationService::scoped())
        .add(InboxIngestionCoordinator::scoped())
        .add(InboxLocationService::scoped())
        .add(InboxSummaryService::scoped())
}
