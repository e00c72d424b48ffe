// Dashboard domain model
use super::history::HistoricalView;
use super::registry::EntityRegistry;
use super::tank::AlarmNotice;
use super::telemetry::{ChartData, Metric, TileData};
use super::window::LiveAggregate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Live,
    /// Historical session entered, results not yet arrived.
    Loading,
    Historical,
}

/// What the render sink draws: one label axis shared by the temperature and
/// level charts.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub mode: ViewMode,
    pub labels: Vec<String>,
    pub charts: Vec<ChartData>,
    pub tiles: Vec<TileData>,
}

impl Dashboard {
    pub fn from_aggregate(
        mode: ViewMode,
        aggregate: &LiveAggregate,
        registry: &EntityRegistry,
        tiles: Vec<TileData>,
    ) -> Self {
        Self {
            mode,
            labels: aggregate.labels().iter().cloned().collect(),
            charts: Metric::ALL
                .iter()
                .map(|&metric| aggregate.chart(metric, registry))
                .collect(),
            tiles,
        }
    }

    pub fn from_history(view: &HistoricalView, tiles: Vec<TileData>) -> Self {
        Self {
            mode: ViewMode::Historical,
            labels: view.labels.clone(),
            charts: view.charts.clone(),
            tiles,
        }
    }

    #[cfg(test)]
    pub fn chart(&self, metric: Metric) -> Option<&ChartData> {
        self.charts.iter().find(|c| c.metric == metric)
    }
}

/// Everything pushed to connected clients.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    Frame(Dashboard),
    Alarm(AlarmNotice),
    Notice(String),
    RevertPrompt { id: u64, message: String },
}
