// Mapper to convert domain models to JSON wire types
use crate::application::dashboard_service::ViewStatus;
use crate::application::ingest_service::FeedStatus;
use crate::domain::dashboard::{Dashboard, DashboardEvent, ViewMode};
use crate::domain::tank::AlarmNotice;
use crate::domain::telemetry::{ChartData, Dataset, TileData};
use crate::infrastructure::config::IngestMode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DashboardPayload {
    pub mode: &'static str,
    pub labels: Vec<String>,
    pub charts: Vec<ChartPayload>,
    pub tiles: Vec<TilePayload>,
}

#[derive(Debug, Serialize)]
pub struct ChartPayload {
    pub id: &'static str,
    pub title: &'static str,
    pub unit: &'static str,
    pub datasets: Vec<DatasetPayload>,
}

#[derive(Debug, Serialize)]
pub struct DatasetPayload {
    pub tank_id: String,
    pub color: &'static str,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Serialize)]
pub struct TilePayload {
    pub tank_id: String,
    pub name: String,
    pub temperature: Option<f64>,
    pub level: Option<f64>,
    pub weight: Option<f64>,
    pub high_limit: Option<f64>,
    pub alarm: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Frame(DashboardPayload),
    Alarm(AlarmNotice),
    Notice { message: String },
    RevertPrompt { id: u64, message: String },
}

#[derive(Debug, Serialize)]
pub struct StatusPayload {
    pub connected: bool,
    pub ingest_mode: &'static str,
    pub last_ingest: Option<String>,
    pub mode: &'static str,
    pub generation: u64,
    pub tanks: usize,
    pub window_len: usize,
    pub max_window: usize,
    pub revert_deadline: Option<String>,
}

fn mode_name(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Live => "live",
        ViewMode::Loading => "loading",
        ViewMode::Historical => "historical",
    }
}

pub fn dashboard_to_json(dashboard: Dashboard) -> DashboardPayload {
    DashboardPayload {
        mode: mode_name(dashboard.mode),
        labels: dashboard.labels,
        charts: dashboard.charts.into_iter().map(chart_to_json).collect(),
        tiles: dashboard.tiles.into_iter().map(tile_to_json).collect(),
    }
}

fn chart_to_json(chart: ChartData) -> ChartPayload {
    ChartPayload {
        id: chart.metric.id(),
        title: chart.metric.title(),
        unit: chart.metric.unit(),
        datasets: chart.datasets.into_iter().map(dataset_to_json).collect(),
    }
}

fn dataset_to_json(dataset: Dataset) -> DatasetPayload {
    DatasetPayload {
        tank_id: dataset.tank_id.into(),
        color: dataset.color,
        values: dataset.values,
    }
}

fn tile_to_json(tile: TileData) -> TilePayload {
    TilePayload {
        tank_id: tile.tank_id.into(),
        name: tile.name,
        temperature: tile.temperature,
        level: tile.level,
        weight: tile.weight,
        high_limit: tile.high_limit,
        alarm: tile.alarm,
    }
}

pub fn event_to_json(event: DashboardEvent) -> EventPayload {
    match event {
        DashboardEvent::Frame(dashboard) => EventPayload::Frame(dashboard_to_json(dashboard)),
        DashboardEvent::Alarm(notice) => EventPayload::Alarm(notice),
        DashboardEvent::Notice(message) => EventPayload::Notice { message },
        DashboardEvent::RevertPrompt { id, message } => EventPayload::RevertPrompt { id, message },
    }
}

pub fn status_to_json(feed: FeedStatus, view: ViewStatus, ingest_mode: IngestMode) -> StatusPayload {
    StatusPayload {
        connected: feed.connected,
        ingest_mode: match ingest_mode {
            IngestMode::Poll => "poll",
            IngestMode::Push => "push",
        },
        last_ingest: feed.last_ingest.map(|t| t.to_rfc3339()),
        mode: mode_name(view.mode),
        generation: view.generation,
        tanks: view.tanks,
        window_len: view.window_len,
        max_window: view.max_window,
        revert_deadline: view.revert_deadline.map(|t| t.to_rfc3339()),
    }
}
