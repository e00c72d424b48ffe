// Calibration service - Validates operator level offsets before publishing them
use crate::application::dashboard_service::DashboardService;
use crate::application::error::CalibrationError;
use crate::application::tank_repository::TankRepository;
use crate::domain::tank::TankId;
use std::sync::Arc;

#[derive(Clone)]
pub struct CalibrationService {
    repository: Arc<dyn TankRepository>,
    dashboard: DashboardService,
    default_height: f64,
}

/// Parses free-form operator input.
pub fn parse_offset(raw: &str) -> Result<f64, CalibrationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CalibrationError::NotANumber(raw.to_string()))
}

/// Offsets are limited to the tank height and kept at millimetre precision.
pub fn validate_offset(offset: f64, height: f64) -> Result<f64, CalibrationError> {
    if !offset.is_finite() {
        return Err(CalibrationError::NotANumber(offset.to_string()));
    }

    let rounded = (offset * 1000.0).round() / 1000.0;
    if rounded.abs() > height {
        return Err(CalibrationError::OutOfRange {
            offset: rounded,
            height,
        });
    }
    Ok(rounded)
}

impl CalibrationService {
    pub fn new(
        repository: Arc<dyn TankRepository>,
        dashboard: DashboardService,
        default_height: f64,
    ) -> Self {
        Self {
            repository,
            dashboard,
            default_height,
        }
    }

    /// Validates locally and only then publishes; invalid input never reaches
    /// the backend.
    pub async fn apply(&self, tank_id: &TankId, offset: f64) -> Result<f64, CalibrationError> {
        let reading = self
            .dashboard
            .latest_reading(tank_id)
            .await
            .ok_or_else(|| CalibrationError::UnknownTank(tank_id.clone()))?;
        let height = reading.height.unwrap_or(self.default_height);
        let offset = validate_offset(offset, height)?;

        self.repository
            .push_calibration_offset(tank_id, offset)
            .await?;
        tracing::info!("Calibration offset for tank {} set to {}", tank_id, offset);
        Ok(offset)
    }
}
