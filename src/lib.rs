pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, redis::RedisHandle, shutdown, state::AppState, telemetry};
use crate::services::{identity::IdentityClient, storage::StorageService};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; rate limiting disabled");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let storage = StorageService::from_settings(&settings).await?;
    if storage.is_none() {
        tracing::warn!("Object storage is not configured; uploads and file purges are disabled");
    }
    let identity = IdentityClient::from_settings(&settings)?;
    let state = AppState::new(settings, db_pool, redis.clone(), storage, identity);

    let shutdown = shutdown::watch_shutdown();
    let background = tasks::scheduler::spawn(state.clone(), shutdown.clone());

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        institution = %state.settings().api().institution,
        "Exam Connect API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(shutdown::wait_for_shutdown(shutdown)).await;

    tasks::scheduler::join(background).await;
    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
