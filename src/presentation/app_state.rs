// Application state for HTTP handlers
use crate::application::calibration_service::CalibrationService;
use crate::application::dashboard_service::DashboardService;
use crate::application::ingest_service::IngestService;
use crate::application::settings_service::SettingsService;
use crate::infrastructure::config::IngestMode;
use crate::infrastructure::event_bus::{EventBus, PromptBroker};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: DashboardService,
    pub ingest: IngestService,
    pub calibration: CalibrationService,
    pub settings: SettingsService,
    pub prompts: Arc<PromptBroker>,
    pub bus: EventBus,
    pub ingest_mode: IngestMode,
}
