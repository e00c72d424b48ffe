// Errors surfaced by the application services
use crate::domain::tank::TankId;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("History for tank {tank_id} is unavailable: {message}")]
    Unavailable { tank_id: TankId, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("Calibration offset is not a number: {0}")]
    NotANumber(String),

    #[error("Calibration offset {offset} exceeds tank height {height}")]
    OutOfRange { offset: f64, height: f64 },

    #[error("Tank {0} does not exist")]
    UnknownTank(TankId),

    #[error("Backend rejected calibration: {0:#}")]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{name} must be at least 1, got {value}")]
    Invalid { name: &'static str, value: i64 },

    #[error("Settings backend unavailable: {0:#}")]
    Backend(#[from] anyhow::Error),
}
