// HTTP request handlers
use crate::application::dashboard_service::HistoryScope;
use crate::application::error::{CalibrationError, SettingsError};
use crate::application::history_service::HistoryRange;
use crate::application::calibration_service::parse_offset;
use crate::domain::tank::{TankId, TankSnapshot};
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::config::IngestMode;
use crate::infrastructure::http_response::{accepts_brotli, respond};
use crate::infrastructure::json_mapper::{dashboard_to_json, status_to_json};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Response, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    #[serde(default)]
    pub tank_id: Option<TankId>,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub keep_live: bool,
}

#[derive(Debug, Deserialize)]
pub struct PromptAnswer {
    pub confirm: bool,
}

/// Offsets arrive from a free-form input, as a JSON number or as text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OffsetInput {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct CalibrationRequest {
    pub offset: OffsetInput,
}

#[derive(Debug, Deserialize)]
pub struct StorageDaysRequest {
    pub days: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryPointsRequest {
    pub points: i64,
}

/// `YYYY-MM-DD` is midnight local time; anything else must be RFC 3339.
fn parse_local_time(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| naive.and_local_timezone(Local).earliest());
    }
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|time| time.with_timezone(&Local))
}

async fn error_response(status: StatusCode, message: String, compress: bool) -> Response<Body> {
    respond(status, &json!({ "error": message }), compress).await
}

fn calibration_status(error: &CalibrationError) -> StatusCode {
    match error {
        CalibrationError::NotANumber(_) | CalibrationError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
        CalibrationError::UnknownTank(_) => StatusCode::NOT_FOUND,
        CalibrationError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}

fn settings_status(error: &SettingsError) -> StatusCode {
    match error {
        SettingsError::Invalid { .. } => StatusCode::BAD_REQUEST,
        SettingsError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn status(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response<Body> {
    let view = state.dashboard.status().await;
    let payload = status_to_json(state.ingest.status(), view, state.ingest_mode);
    respond(StatusCode::OK, &payload, accepts_brotli(&headers)).await
}

/// Current frame as a single JSON document
pub async fn dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response<Body> {
    let frame = state.dashboard.frame().await;
    respond(StatusCode::OK, &dashboard_to_json(frame), accepts_brotli(&headers)).await
}

/// Stream frames, alarms, notices and revert prompts (progressive updates)
pub async fn stream_dashboard(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // Subscribe before reading the frame so nothing published in between is lost.
    let rx = state.bus.subscribe();
    let current = state.dashboard.frame().await;
    tracing::debug!("Dashboard stream client connected");
    stream_from_receiver(current, rx, accepts_brotli(&headers))
}

/// Push ingestion of one snapshot
pub async fn ingest(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Response<Body> {
    let compress = accepts_brotli(&headers);
    if state.ingest_mode != IngestMode::Push {
        return error_response(StatusCode::CONFLICT, "Service is polling the tank feed".to_string(), compress).await;
    }

    match TankSnapshot::from_json(body) {
        Ok(snapshot) => {
            let outcome = state.ingest.accept(snapshot).await;
            respond(
                StatusCode::OK,
                &json!({ "new_column": outcome.new_column, "evicted": outcome.evicted }),
                compress,
            )
            .await
        }
        Err(e) => {
            tracing::warn!("Rejected pushed snapshot: {:#}", e);
            error_response(StatusCode::BAD_REQUEST, format!("{:#}", e), compress).await
        }
    }
}

pub async fn query_history(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<HistoryRequest>,
) -> Response<Body> {
    let compress = accepts_brotli(&headers);
    let (Some(start), Some(end)) = (parse_local_time(&request.start), parse_local_time(&request.end)) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid date range {} .. {}", request.start, request.end),
            compress,
        )
        .await;
    };

    let scope = match request.tank_id {
        Some(id) => HistoryScope::Tank(id),
        None => HistoryScope::All,
    };

    match state
        .dashboard
        .query_history(scope, HistoryRange::new(start, end), request.keep_live)
        .await
    {
        Some(frame) => respond(StatusCode::OK, &dashboard_to_json(frame), compress).await,
        None => {
            error_response(
                StatusCode::CONFLICT,
                "Historical session was superseded".to_string(),
                compress,
            )
            .await
        }
    }
}

pub async fn restore_live(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response<Body> {
    let frame = state.dashboard.restore_live().await;
    respond(StatusCode::OK, &dashboard_to_json(frame), accepts_brotli(&headers)).await
}

pub async fn answer_prompt(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
    Json(answer): Json<PromptAnswer>,
) -> StatusCode {
    if state.prompts.answer(id, answer.confirm).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn calibrate(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CalibrationRequest>,
) -> Response<Body> {
    let compress = accepts_brotli(&headers);
    let tank_id = TankId::new(id);
    let applied = match request.offset {
        OffsetInput::Number(offset) => state.calibration.apply(&tank_id, offset).await,
        OffsetInput::Text(raw) => match parse_offset(&raw) {
            Ok(offset) => state.calibration.apply(&tank_id, offset).await,
            Err(e) => Err(e),
        },
    };

    match applied {
        Ok(offset) => {
            respond(StatusCode::OK, &json!({ "tank_id": tank_id, "offset": offset }), compress).await
        }
        Err(e) => {
            tracing::warn!("Calibration of tank {} rejected: {}", tank_id, e);
            error_response(calibration_status(&e), e.to_string(), compress).await
        }
    }
}

pub async fn get_storage_days(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response<Body> {
    let compress = accepts_brotli(&headers);
    match state.settings.storage_days().await {
        Ok(days) => respond(StatusCode::OK, &json!({ "storage_days": days }), compress).await,
        Err(e) => error_response(settings_status(&e), e.to_string(), compress).await,
    }
}

pub async fn set_storage_days(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<StorageDaysRequest>,
) -> Response<Body> {
    let compress = accepts_brotli(&headers);
    match state.settings.set_storage_days(request.days).await {
        Ok(days) => respond(StatusCode::OK, &json!({ "storage_days": days }), compress).await,
        Err(e) => error_response(settings_status(&e), e.to_string(), compress).await,
    }
}

pub async fn get_history_points(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response<Body> {
    let compress = accepts_brotli(&headers);
    match state.settings.history_points().await {
        Ok(points) => respond(StatusCode::OK, &json!({ "history_points": points }), compress).await,
        Err(e) => error_response(settings_status(&e), e.to_string(), compress).await,
    }
}

pub async fn set_history_points(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<HistoryPointsRequest>,
) -> Response<Body> {
    let compress = accepts_brotli(&headers);
    match state.settings.set_history_points(request.points).await {
        Ok(points) => respond(StatusCode::OK, &json!({ "history_points": points }), compress).await,
        Err(e) => error_response(settings_status(&e), e.to_string(), compress).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_local_time() {
        let day = parse_local_time("2024-05-01").unwrap();
        assert_eq!(day, Local.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());

        let instant = parse_local_time("2024-05-01T12:30:00Z").unwrap();
        assert_eq!(instant.with_timezone(&chrono::Utc).hour(), 12);

        assert!(parse_local_time("01/05/2024").is_none());
    }

    #[test]
    fn test_offset_input_accepts_numbers_and_text() {
        let number: CalibrationRequest = serde_json::from_value(json!({ "offset": -0.25 })).unwrap();
        assert!(matches!(number.offset, OffsetInput::Number(v) if v == -0.25));

        let text: CalibrationRequest = serde_json::from_value(json!({ "offset": "0.125" })).unwrap();
        assert!(matches!(text.offset, OffsetInput::Text(ref s) if s == "0.125"));
    }

    #[test]
    fn test_history_request_defaults_to_all_tanks() {
        let request: HistoryRequest =
            serde_json::from_value(json!({ "start": "2024-05-01", "end": "2024-05-02" })).unwrap();

        assert!(request.tank_id.is_none());
        assert!(!request.keep_live);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            calibration_status(&CalibrationError::UnknownTank(TankId::from(9))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            calibration_status(&CalibrationError::OutOfRange { offset: 9.0, height: 8.0 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            settings_status(&SettingsError::Backend(anyhow::anyhow!("down"))),
            StatusCode::BAD_GATEWAY
        );
    }
}
