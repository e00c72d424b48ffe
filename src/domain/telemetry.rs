// Telemetry data domain models
use super::tank::{TankId, TankReading};
use chrono::{DateTime, Utc};

/// Charted measurements. Each one gets its own chart over the shared label axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Level,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Temperature, Metric::Level];

    pub fn id(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Level => "level",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Level => "Level",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Level => "m",
        }
    }

    pub fn of_reading(&self, reading: &TankReading) -> Option<f64> {
        match self {
            Metric::Temperature => reading.temperature,
            Metric::Level => reading.level,
        }
    }
}

/// One entry of a tank's stored history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub level: Option<f64>,
}

impl HistoryPoint {
    pub fn new(timestamp: DateTime<Utc>, temperature: Option<f64>, level: Option<f64>) -> Self {
        Self {
            timestamp,
            temperature,
            level,
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Level => self.level,
        }
    }
}

/// Latest-value tile for one tank.
#[derive(Debug, Clone, PartialEq)]
pub struct TileData {
    pub tank_id: TankId,
    pub name: String,
    pub temperature: Option<f64>,
    pub level: Option<f64>,
    pub weight: Option<f64>,
    pub high_limit: Option<f64>,
    pub alarm: bool,
}

impl TileData {
    pub fn from_reading(tank_id: &TankId, reading: &TankReading) -> Self {
        Self {
            tank_id: tank_id.clone(),
            name: reading.display_name(tank_id),
            temperature: reading.temperature,
            level: reading.level,
            weight: reading.weight,
            high_limit: reading.high_limit,
            alarm: reading.alarm_shown,
        }
    }
}

/// Series of one tank on one chart, aligned with the frame labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub tank_id: TankId,
    pub color: &'static str,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub metric: Metric,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    pub fn new(metric: Metric, datasets: Vec<Dataset>) -> Self {
        Self { metric, datasets }
    }

    #[cfg(test)]
    pub fn dataset(&self, tank_id: &TankId) -> Option<&Dataset> {
        self.datasets.iter().find(|d| &d.tank_id == tank_id)
    }
}
