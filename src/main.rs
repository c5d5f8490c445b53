// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use clinic_records_server::{
    api::router,
    auth::TokenService,
    config::{LogFormat, ServerConfig, DEFAULT_LOG_FILTER},
    inference::InferenceClient,
    state::AppState,
    storage::{reconcile, ClinicDatabase},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env().expect("Invalid server configuration");
    init_tracing(config.log_format);

    let db_path = config.database_path();
    let db = ClinicDatabase::open(&db_path).expect("Failed to open record database");
    tracing::info!(path = %db_path.display(), "Record database opened");

    let repaired = reconcile(&db).expect("Failed to reconcile doctor patient lists");
    if !repaired.is_empty() {
        tracing::warn!(doctors = repaired.len(), "Repaired doctor patient lists at startup");
    }

    let mut state = AppState::new(db);

    match config.jwt_secret.as_deref().map(TokenService::new) {
        Some(Ok(tokens)) => state = state.with_token_service(tokens),
        Some(Err(e)) => tracing::error!(error = %e, "Token service unavailable; authentication will fail"),
        None => tracing::error!("JWT_SECRET is not set; login and protected routes will fail"),
    }

    match InferenceClient::from_config(&config) {
        Ok(Some(client)) => state = state.with_inference(client),
        Ok(None) => tracing::info!("No inference endpoints configured; detection is disabled"),
        Err(e) => tracing::error!(error = %e, "Inference client unavailable; detection is disabled"),
    }

    let app = router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");

    tracing::info!(%addr, "Clinic records server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");
}
