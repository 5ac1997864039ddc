//! Shared test setup: in-memory database, service container and fakes.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use di::{Injectable, Ref, ServiceCollection, ServiceProvider, existing_as_self, inject, injectable};
use reqwest::StatusCode as HttpStatus;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use support_inbox_api::add_core_services;
use support_inbox_api::config::AppConfig;
use support_inbox_api::error::{CompletionError, CrmError};
use support_inbox_api::infrastructure::database::DatabaseConnection;
use support_inbox_api::infrastructure::traits::{
    CompletionClient, CompletionRequest, CrmStatusClient,
};
use std::sync::Mutex;
use tower::ServiceExt;

pub const CANNED_REPLY: &str = "Thanks for reaching out, how can I help?";

/// Completion service that always answers with [`CANNED_REPLY`].
pub struct CannedCompletion;

#[injectable(CompletionClient)]
impl CannedCompletion {
    #[inject]
    pub fn create() -> CannedCompletion {
        CannedCompletion
    }
}

#[async_trait]
impl CompletionClient for CannedCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
        Ok(CANNED_REPLY.to_owned())
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        Ok(vec!["gpt-4.1-mini".to_owned()])
    }
}

/// Completion service that is down.
pub struct FailingCompletion;

#[injectable(CompletionClient)]
impl FailingCompletion {
    #[inject]
    pub fn create() -> FailingCompletion {
        FailingCompletion
    }
}

#[async_trait]
impl CompletionClient for FailingCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
        Err(CompletionError::Status {
            status: HttpStatus::SERVICE_UNAVAILABLE,
            body: "overloaded".to_owned(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        Err(CompletionError::Status {
            status: HttpStatus::SERVICE_UNAVAILABLE,
            body: "overloaded".to_owned(),
        })
    }
}

/// Requests seen by [`RecordingCompletion`], shared with the test through the container.
#[derive(Default)]
pub struct RequestLog {
    requests: Mutex<Vec<CompletionRequest>>,
}

impl RequestLog {
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Answers with [`CANNED_REPLY`] and records every request it receives.
pub struct RecordingCompletion {
    log: Ref<RequestLog>,
}

#[injectable(CompletionClient)]
impl RecordingCompletion {
    #[inject]
    pub fn create(log: Ref<RequestLog>) -> RecordingCompletion {
        RecordingCompletion { log }
    }
}

#[async_trait]
impl CompletionClient for RecordingCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.log.requests.lock().unwrap().push(request);
        Ok(CANNED_REPLY.to_owned())
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        Ok(Vec::new())
    }
}

pub struct OfflineCrm;

#[injectable(CrmStatusClient)]
impl OfflineCrm {
    #[inject]
    pub fn create() -> OfflineCrm {
        OfflineCrm
    }
}

#[async_trait]
impl CrmStatusClient for OfflineCrm {
    async fn check_location(&self, _location_id: &str, _api_key: &str) -> Result<(), CrmError> {
        Err(CrmError::Status(HttpStatus::UNAUTHORIZED))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Completion {
    /// No credential configured; the client is never called.
    Unconfigured,
    Canned,
    Failing,
    /// Like `Canned`, and the requests can be read from the registered [`RequestLog`].
    Recording,
}

/// In-memory database with migrations applied.
///
/// A single connection, so every query sees the same in-memory database.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

pub fn test_config(completion: Completion) -> AppConfig {
    let mut config = AppConfig::with_database_url("sqlite::memory:");
    if !matches!(completion, Completion::Unconfigured) {
        config.completion_api_key = Some("test-key".to_owned());
    }
    config
}

pub fn build_provider(pool: SqlitePool, completion: Completion) -> ServiceProvider {
    let mut services = ServiceCollection::new();
    services
        .add(existing_as_self(test_config(completion)))
        .add(existing_as_self(DatabaseConnection::from_pool(pool)))
        .add(existing_as_self(RequestLog::default()))
        .add(OfflineCrm::singleton());
    match completion {
        Completion::Failing => services.add(FailingCompletion::singleton()),
        Completion::Recording => services.add(RecordingCompletion::singleton()),
        Completion::Unconfigured | Completion::Canned => services.add(CannedCompletion::singleton()),
    };
    add_core_services(&mut services);

    services.build_provider().unwrap()
}

pub async fn setup(completion: Completion) -> (SqlitePool, ServiceProvider) {
    let pool = setup_test_db().await;
    let provider = build_provider(pool.clone(), completion);
    (pool, provider)
}

/// Sends one request and returns the status and the JSON body (`Null` if empty).
pub async fn send(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}
