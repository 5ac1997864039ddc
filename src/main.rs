//! Customer-support conversation ingestion service

use support_inbox_api::add_core_services;
use support_inbox_api::api;
use support_inbox_api::config::AppConfig;
use support_inbox_api::infrastructure::completion::OpenAiCompletionClient;
use support_inbox_api::infrastructure::crm::HttpCrmStatusClient;
use support_inbox_api::infrastructure::database::DatabaseConnection;
use support_inbox_api::infrastructure::traits::{CompletionClient, CrmStatusClient};

use anyhow::{Context, anyhow};
use axum::http::Method;
use di::{ServiceCollection, existing, existing_as_self};
use log::{info, warn};
use std::net::SocketAddr;
use tokio::runtime::{Builder, Runtime};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    // initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(web_server_task(config))
}

async fn web_server_task(config: AppConfig) -> anyhow::Result<()> {
    let database = DatabaseConnection::connect(&config.database_url)
        .with_context(|| format!("invalid DATABASE_URL {}", config.database_url))?;
    database.migrate().await.context("failed to apply migrations")?;

    if !config.completion_configured() {
        warn!("OPENAI_API_KEY is not set, bot replies run in degraded mode");
    }

    let completion = OpenAiCompletionClient::new(&config).context("failed to build completion client")?;
    let crm = HttpCrmStatusClient::new(&config).context("failed to build CRM client")?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let mut services = ServiceCollection::new();
    services
        .add(existing_as_self(config))
        .add(existing_as_self(database))
        .add(existing::<dyn CompletionClient, OpenAiCompletionClient>(Box::new(completion)))
        .add(existing::<dyn CrmStatusClient, HttpCrmStatusClient>(Box::new(crm)));
    add_core_services(&mut services);
    let provider = services
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e:?}"))?;

    let app = api::router(provider).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH])
                .allow_origin(Any),
        ),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
    }
}
