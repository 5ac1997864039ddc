//! Process configuration, read once at startup.

use anyhow::{Context, anyhow};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_COMPLETION_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CRM_API_BASE: &str = "https://services.leadconnectorhq.com";
pub const DEFAULT_CRM_API_VERSION: &str = "2021-07-28";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub app_base_url: String,
    pub database_url: String,
    /// Credential for the completion service. `None` puts the assistant in degraded mode.
    pub completion_api_key: Option<String>,
    pub completion_api_base: String,
    pub completion_timeout: Duration,
    pub crm_api_base: String,
    pub crm_api_version: String,
    pub master_location_id: Option<String>,
    pub log_level: String,
}

impl AppConfig {
    /// Reads the configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> anyhow::Result<AppConfig> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL must be set"))?;

        Ok(AppConfig {
            port: parsed_var("PORT", 8080)?,
            app_base_url: var_or("APP_BASE_URL", "http://localhost:8080"),
            database_url,
            completion_api_key: optional_var("OPENAI_API_KEY"),
            completion_api_base: var_or("OPENAI_API_BASE", DEFAULT_COMPLETION_API_BASE),
            completion_timeout: Duration::from_secs(parsed_var("COMPLETION_TIMEOUT_SECS", 30)?),
            crm_api_base: var_or("GHL_API_BASE", DEFAULT_CRM_API_BASE),
            crm_api_version: var_or("GHL_API_VERSION", DEFAULT_CRM_API_VERSION),
            master_location_id: optional_var("MASTER_LOCATION_ID"),
            log_level: var_or("LOG_LEVEL", "info"),
        })
    }

    /// Configuration with defaults for everything but the database URL.
    pub fn with_database_url(database_url: impl Into<String>) -> AppConfig {
        AppConfig {
            port: 8080,
            app_base_url: "http://localhost:8080".to_owned(),
            database_url: database_url.into(),
            completion_api_key: None,
            completion_api_base: DEFAULT_COMPLETION_API_BASE.to_owned(),
            completion_timeout: Duration::from_secs(30),
            crm_api_base: DEFAULT_CRM_API_BASE.to_owned(),
            crm_api_version: DEFAULT_CRM_API_VERSION.to_owned(),
            master_location_id: None,
            log_level: "info".to_owned(),
        }
    }

    pub fn completion_configured(&self) -> bool {
        self.completion_api_key.is_some()
    }

    pub fn embed_code(&self, public_key: &str) -> String {
        format!(
            r#"<script src="{}/widget.js" data-location-key="{}"></script>"#,
            self.app_base_url.trim_end_matches('/'),
            public_key
        )
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    optional_var(key).unwrap_or_else(|| default.to_owned())
}

fn parsed_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{key} has an invalid value: {value}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_code_trims_trailing_slash() {
        let mut config = AppConfig::with_database_url("sqlite::memory:");
        config.app_base_url = "https://inbox.example.com/".to_owned();

        assert_eq!(
            config.embed_code("abc123"),
            r#"<script src="https://inbox.example.com/widget.js" data-location-key="abc123"></script>"#
        );
    }

    #[test]
    fn test_default_config_has_no_completion_credential() {
        let config = AppConfig::with_database_url("sqlite::memory:");
        assert!(!config.completion_configured());
        assert_eq!(config.completion_timeout, Duration::from_secs(30));
    }
}
