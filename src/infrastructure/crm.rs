//! CRM reachability check, used for the integration status display only.

use crate::config::AppConfig;
use crate::error::CrmError;
use crate::infrastructure::traits::CrmStatusClient;
use async_trait::async_trait;
use std::time::Duration;

pub struct HttpCrmStatusClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl HttpCrmStatusClient {
    pub fn new(config: &AppConfig) -> Result<HttpCrmStatusClient, CrmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(HttpCrmStatusClient {
            http,
            base_url: config.crm_api_base.trim_end_matches('/').to_owned(),
            api_version: config.crm_api_version.clone(),
        })
    }
}

#[async_trait]
impl CrmStatusClient for HttpCrmStatusClient {
    async fn check_location(&self, location_id: &str, api_key: &str) -> Result<(), CrmError> {
        let response = self
            .http
            .get(format!("{}/locations/{location_id}", self.base_url))
            .bearer_auth(api_key)
            .header("Version", &self.api_version)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CrmError::Status(response.status()));
        }
        Ok(())
    }
}
