//! Conversation and message ingestion core.

pub mod assistant;
pub mod extract;
pub mod ingestion;
pub mod lifecycle;
pub mod services;
pub mod traits;
pub mod webhook;
