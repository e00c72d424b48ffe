use crate::application::view_mode::RestorePolicy;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub ingest: IngestSettings,
    pub window: WindowSettings,
    pub view: ViewSettings,
    pub calibration: CalibrationSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub listen_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Fetch `/api/tanks` on a fixed interval.
    Poll,
    /// Upstream posts snapshots to `/api/ingest`.
    Push,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestSettings {
    pub mode: IngestMode,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowSettings {
    pub max_window: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewSettings {
    pub revert_prompt_secs: u64,
    pub prompt_timeout_secs: u64,
    pub restore_policy: RestorePolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationSettings {
    pub default_tank_height: f64,
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl IngestSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl ViewSettings {
    pub fn revert_after(&self) -> Duration {
        Duration::from_secs(self.revert_prompt_secs)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(builder
        .set_default("server.listen_addr", "0.0.0.0:8080")?
        .set_default("backend.base_url", "http://localhost:5000")?
        .set_default("backend.request_timeout_secs", 10)?
        .set_default("ingest.mode", "poll")?
        .set_default("ingest.poll_interval_secs", 30)?
        .set_default("window.max_window", 30)?
        .set_default("view.revert_prompt_secs", 30)?
        .set_default("view.prompt_timeout_secs", 60)?
        .set_default("view.restore_policy", "current")?
        .set_default("calibration.default_tank_height", 8.0)?)
}

/// Defaults, then `config/dashboard.*` if present, then `DASHBOARD__SECTION__KEY`
/// environment variables.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = with_defaults(config::Config::builder())?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let config: DashboardConfig = settings.try_deserialize()?;
    if config.window.max_window == 0 {
        anyhow::bail!("window.max_window must be at least 1");
    }
    Ok(config)
}
