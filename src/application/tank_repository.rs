// Repository traits for the tank backend
use crate::domain::tank::{TankId, TankSnapshot};
use crate::domain::telemetry::HistoryPoint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait TankRepository: Send + Sync {
    /// Current readings of every tank (poll-mode ingestion)
    async fn fetch_tanks(&self) -> anyhow::Result<TankSnapshot>;

    /// Stored history of one tank between two instants, ascending by timestamp
    async fn fetch_history(
        &self,
        tank_id: &TankId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<HistoryPoint>>;

    /// Publish an operator calibration offset for one tank
    async fn push_calibration_offset(&self, tank_id: &TankId, offset: f64) -> anyhow::Result<()>;
}

/// Opaque retention settings held by the backend.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn storage_days(&self) -> anyhow::Result<u32>;

    async fn set_storage_days(&self, days: u32) -> anyhow::Result<u32>;

    async fn history_points(&self) -> anyhow::Result<u32>;

    async fn set_history_points(&self, points: u32) -> anyhow::Result<u32>;
}
