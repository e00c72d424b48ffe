// History aggregator - fan-out/fan-in over per-tank history queries
use crate::application::error::HistoryError;
use crate::application::tank_repository::TankRepository;
use crate::domain::history::HistoryResults;
use crate::domain::tank::TankId;
use crate::domain::telemetry::HistoryPoint;
use chrono::{DateTime, Local, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;

/// Requested query window. The end bound covers the whole calendar day of `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryRange {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl HistoryRange {
    pub fn new(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        Self { start, end }
    }

    pub fn start_bound(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    /// 23:59:59.999 local time on the day of `end`.
    pub fn end_bound(&self) -> DateTime<Utc> {
        self.end
            .date_naive()
            .and_hms_milli_opt(23, 59, 59, 999)
            .and_then(|naive| naive.and_local_timezone(Local).latest())
            .unwrap_or(self.end)
            .with_timezone(&Utc)
    }
}

/// Settlement of one tank's query: failures resolve to an empty sequence and
/// keep the error for the user notification.
#[derive(Debug, Default)]
pub struct HistoryOutcome {
    pub points: Vec<HistoryPoint>,
    pub error: Option<HistoryError>,
}

#[derive(Debug, Default)]
pub struct FanIn {
    pub results: HistoryResults,
    pub errors: Vec<HistoryError>,
}

#[derive(Clone)]
pub struct HistoryAggregator {
    repository: Arc<dyn TankRepository>,
}

impl HistoryAggregator {
    pub fn new(repository: Arc<dyn TankRepository>) -> Self {
        Self { repository }
    }

    pub async fn query_one(&self, tank_id: &TankId, range: &HistoryRange) -> HistoryOutcome {
        match self
            .repository
            .fetch_history(tank_id, range.start_bound(), range.end_bound())
            .await
        {
            Ok(points) => {
                tracing::debug!("History for tank {}: {} points", tank_id, points.len());
                HistoryOutcome {
                    points,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("History query for tank {} failed: {:#}", tank_id, e);
                HistoryOutcome {
                    points: Vec::new(),
                    error: Some(HistoryError::Unavailable {
                        tank_id: tank_id.clone(),
                        message: format!("{:#}", e),
                    }),
                }
            }
        }
    }

    /// Queries every tank concurrently and resolves once each request has
    /// settled. One failure never cancels the others, and there is no timeout:
    /// a request that never settles holds back the whole result.
    pub async fn query_all(&self, tank_ids: &[TankId], range: &HistoryRange) -> FanIn {
        let mut requested: Vec<TankId> = Vec::with_capacity(tank_ids.len());
        for id in tank_ids {
            if !requested.contains(id) {
                requested.push(id.clone());
            }
        }

        let total = requested.len();
        let mut pending: FuturesUnordered<_> = requested
            .iter()
            .map(|id| async move { (id, self.query_one(id, range).await) })
            .collect();

        let mut settled: HashMap<&TankId, HistoryOutcome> = HashMap::with_capacity(total);
        while settled.len() < total {
            match pending.next().await {
                Some((id, outcome)) => {
                    settled.insert(id, outcome);
                    tracing::debug!("History fan-in: {}/{} settled", settled.len(), total);
                }
                None => break,
            }
        }

        let mut fan_in = FanIn::default();
        for id in &requested {
            let outcome = settled.remove(id).unwrap_or_default();
            fan_in.results.push(id.clone(), outcome.points);
            fan_in.errors.extend(outcome.error);
        }
        fan_in
    }
}
