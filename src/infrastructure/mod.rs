//! Storage and outbound integrations.

pub mod completion;
pub mod crm;
pub mod database;
pub mod entities;
pub mod repositories;
pub mod traits;
