// Tank backend repository implementation over its JSON HTTP API
use crate::application::tank_repository::{SettingsStore, TankRepository};
use crate::domain::tank::{TankId, TankSnapshot};
use crate::domain::telemetry::HistoryPoint;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BackendRepository {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    success: bool,
    #[serde(default)]
    history: Vec<HistoryRecord>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    timestamp: String,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    level: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageDaysResponse {
    #[serde(default = "default_success")]
    success: bool,
    storage_days: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryPointsResponse {
    #[serde(default = "default_success")]
    success: bool,
    history_points: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Backend timestamps are RFC 3339, or naive ISO 8601 in the backend's local time.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|time| time.with_timezone(&Utc))
}

impl BackendRepository {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_history_url(&self, tank_id: &TankId, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "{}/api/history/{}?start_time={}&end_time={}",
            self.base_url,
            urlencoding::encode(tank_id.as_str()),
            urlencoding::encode(&start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            urlencoding::encode(&end.to_rfc3339_opts(SecondsFormat::Millis, true)),
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to tank backend")?;
        Self::read_json(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, url: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to tank backend")?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Tank backend request failed with status {}: {}", status, body);
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse tank backend response")
    }
}

#[async_trait]
impl TankRepository for BackendRepository {
    async fn fetch_tanks(&self) -> Result<TankSnapshot> {
        let url = format!("{}/api/tanks", self.base_url);
        let value: serde_json::Value = self.get_json(&url).await?;
        TankSnapshot::from_json(value).context("Malformed tank snapshot")
    }

    async fn fetch_history(
        &self,
        tank_id: &TankId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>> {
        let url = self.build_history_url(tank_id, start, end);
        tracing::debug!("Fetching history: {}", url);
        let response: HistoryResponse = self.get_json(&url).await?;

        if !response.success {
            anyhow::bail!(
                "Tank backend rejected history query: {}",
                response.error.unwrap_or_default()
            );
        }

        let total = response.history.len();
        let points: Vec<HistoryPoint> = response
            .history
            .into_iter()
            .filter_map(|record| {
                parse_timestamp(&record.timestamp)
                    .map(|ts| HistoryPoint::new(ts, record.temperature, record.level))
            })
            .collect();

        if points.len() < total {
            tracing::warn!(
                "Skipped {} history records with unparseable timestamps for tank {}",
                total - points.len(),
                tank_id
            );
        }
        Ok(points)
    }

    async fn push_calibration_offset(&self, tank_id: &TankId, offset: f64) -> Result<()> {
        let url = format!(
            "{}/api/tank/{}/error",
            self.base_url,
            urlencoding::encode(tank_id.as_str())
        );
        let response: CommandResponse = self.post_json(&url, json!({ "error": offset })).await?;

        if !response.success {
            anyhow::bail!(
                "{}",
                response
                    .message
                    .or(response.error)
                    .unwrap_or_else(|| "calibration rejected".to_string())
            );
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for BackendRepository {
    async fn storage_days(&self) -> Result<u32> {
        let url = format!("{}/api/storage/days", self.base_url);
        let response: StorageDaysResponse = self.get_json(&url).await?;
        response.storage_days.context("Missing storage_days in response")
    }

    async fn set_storage_days(&self, days: u32) -> Result<u32> {
        let url = format!("{}/api/storage/days", self.base_url);
        let response: StorageDaysResponse = self.post_json(&url, json!({ "days": days })).await?;
        if !response.success {
            anyhow::bail!("{}", response.error.unwrap_or_default());
        }
        response.storage_days.context("Missing storage_days in response")
    }

    async fn history_points(&self) -> Result<u32> {
        let url = format!("{}/api/history/points", self.base_url);
        let response: HistoryPointsResponse = self.get_json(&url).await?;
        response.history_points.context("Missing history_points in response")
    }

    async fn set_history_points(&self, points: u32) -> Result<u32> {
        let url = format!("{}/api/history/points", self.base_url);
        let response: HistoryPointsResponse =
            self.post_json(&url, json!({ "points": points })).await?;
        if !response.success {
            anyhow::bail!("{}", response.error.unwrap_or_default());
        }
        response.history_points.context("Missing history_points in response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_history_url() {
        let repo = BackendRepository::new("http://backend:5000/".to_string(), Duration::from_secs(1)).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 15, 59, 59).unwrap();

        let url = repo.build_history_url(&TankId::from(3), start, end);

        assert_eq!(
            url,
            "http://backend:5000/api/history/3?start_time=2024-05-01T00%3A00%3A00.000Z&end_time=2024-05-02T15%3A59%3A59.000Z"
        );
    }

    #[test]
    fn test_parse_timestamp_accepts_offsets_and_naive_local() {
        let utc = parse_timestamp("2024-05-01T08:00:00+02:00").unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap());

        let naive = parse_timestamp("2024-05-01T08:00:00.250000").unwrap();
        let expected = Local
            .with_ymd_and_hms(2024, 5, 1, 8, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
            + chrono::Duration::milliseconds(250);
        assert_eq!(naive, expected);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_history_payload_shape() {
        let response: HistoryResponse = serde_json::from_value(json!({
            "success": true,
            "tank_id": "1",
            "history": [
                {"timestamp": "2024-05-01T08:00:00Z", "temperature": 150.2, "level": 3.1, "weight": 12.0}
            ]
        }))
        .unwrap();

        assert!(response.success);
        assert_eq!(response.history.len(), 1);
        assert_eq!(response.history[0].level, Some(3.1));
    }
}
