// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    Router,
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::calibration_service::CalibrationService;
use crate::application::dashboard_service::{DashboardService, DashboardState};
use crate::application::history_service::HistoryAggregator;
use crate::application::ingest_service::IngestService;
use crate::application::settings_service::SettingsService;
use crate::infrastructure::backend_repository::BackendRepository;
use crate::infrastructure::config::{IngestMode, load_dashboard_config};
use crate::infrastructure::event_bus::{EventBus, PromptBroker};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    answer_prompt, calibrate, dashboard, get_history_points, get_storage_days, health_check,
    ingest, query_history, restore_live, set_history_points, set_storage_days, status,
    stream_dashboard,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_dashboard_config()?;

    // Infrastructure
    let repository = Arc::new(BackendRepository::new(
        config.backend.base_url.clone(),
        config.backend.request_timeout(),
    )?);
    let bus = EventBus::new();
    let prompts = Arc::new(PromptBroker::new(bus.clone(), config.view.prompt_timeout()));
    let sink = Arc::new(bus.clone());

    // Application
    let dashboard_service = DashboardService::new(
        DashboardState::new(config.window.max_window, config.view.restore_policy),
        HistoryAggregator::new(repository.clone()),
        sink.clone(),
        sink.clone(),
        sink,
        prompts.clone(),
        config.view.revert_after(),
    );
    let ingest_service = IngestService::new(repository.clone(), dashboard_service.clone());
    let calibration = CalibrationService::new(
        repository.clone(),
        dashboard_service.clone(),
        config.calibration.default_tank_height,
    );
    let settings = SettingsService::new(repository);

    match config.ingest.mode {
        IngestMode::Poll => {
            tokio::spawn(ingest_service.clone().run_polling(config.ingest.poll_interval()));
        }
        IngestMode::Push => tracing::info!("Waiting for snapshots on /api/ingest"),
    }

    let state = Arc::new(AppState {
        dashboard: dashboard_service,
        ingest: ingest_service,
        calibration,
        settings,
        prompts,
        bus,
        ingest_mode: config.ingest.mode,
    });

    // Compression is applied per response and per stream chunk, not as a layer.
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/status", get(status))
        .route("/api/dashboard", get(dashboard))
        .route("/api/dashboard/stream", get(stream_dashboard))
        .route("/api/ingest", post(ingest))
        .route("/api/history", post(query_history))
        .route("/api/view/live", post(restore_live))
        .route("/api/view/prompts/:id", post(answer_prompt))
        .route("/api/tanks/:id/calibration", post(calibrate))
        .route("/api/settings/storage-days", get(get_storage_days).post(set_storage_days))
        .route("/api/settings/history-points", get(get_history_points).post(set_history_points))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config.server.listen_addr.parse()?;
    tracing::info!("Starting tank-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
