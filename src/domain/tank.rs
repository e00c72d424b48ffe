// Tank domain model
use super::telemetry::Metric;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Stable identifier of a monitored tank.
///
/// Backends report ids either as numbers or as strings; both are kept as text.
/// Ordering is natural: numeric ids compare by value and sort before textual ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTankId", into = "String")]
pub struct TankId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTankId {
    Number(u64),
    Text(String),
}

impl From<RawTankId> for TankId {
    fn from(raw: RawTankId) -> Self {
        match raw {
            RawTankId::Number(n) => TankId(n.to_string()),
            RawTankId::Text(s) => TankId(s),
        }
    }
}

impl TankId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl From<&str> for TankId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for TankId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<TankId> for String {
    fn from(id: TankId) -> Self {
        id.0
    }
}

impl fmt::Display for TankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for TankId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for TankId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One tank's state as reported by the backend.
///
/// Missing measurements stay `None` and are plotted as gaps.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TankReading {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default, alias = "levelHighLimit")]
    pub high_limit: Option<f64>,
    #[serde(default)]
    pub alarm_shown: bool,
}

impl TankReading {
    pub fn display_name(&self, id: &TankId) -> String {
        self.name.clone().unwrap_or_else(|| format!("Tank {}", id))
    }
}

/// A full ingestion payload, in natural tank id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TankSnapshot {
    pub readings: Vec<(TankId, TankReading)>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotPayload {
    Wrapped { tanks: Box<SnapshotPayload> },
    Keyed(BTreeMap<String, TankReading>),
    Listed(Vec<ListedReading>),
}

#[derive(Deserialize)]
struct ListedReading {
    #[serde(default)]
    id: Option<TankId>,
    #[serde(flatten)]
    reading: TankReading,
}

impl TankSnapshot {
    pub fn new(mut readings: Vec<(TankId, TankReading)>) -> Self {
        readings.sort_by(|a, b| a.0.cmp(&b.0));
        readings.dedup_by(|later, earlier| later.0 == earlier.0);
        Self { readings }
    }

    /// Accepts an object keyed by tank id, a list of readings (ids default to
    /// their 1-based position), or either of those wrapped in `{"tanks": ...}`.
    pub fn from_json(value: serde_json::Value) -> anyhow::Result<Self> {
        let payload: SnapshotPayload = serde_json::from_value(value)?;
        Ok(Self::from_payload(payload))
    }

    fn from_payload(payload: SnapshotPayload) -> Self {
        match payload {
            SnapshotPayload::Wrapped { tanks } => Self::from_payload(*tanks),
            SnapshotPayload::Keyed(map) => Self::new(
                map.into_iter()
                    .map(|(id, reading)| (TankId::new(id), reading))
                    .collect(),
            ),
            SnapshotPayload::Listed(list) => Self::new(
                list.into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let id = item.id.unwrap_or_else(|| TankId::new((i + 1).to_string()));
                        (id, item.reading)
                    })
                    .collect(),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Every reported (tank, metric, value) triple; missing measurements are skipped.
    pub fn samples(&self) -> impl Iterator<Item = (&TankId, Metric, f64)> + '_ {
        self.readings.iter().flat_map(|(id, reading)| {
            Metric::ALL
                .into_iter()
                .filter_map(move |metric| metric.of_reading(reading).map(|v| (id, metric, v)))
        })
    }
}

/// Payload forwarded to the alarm notifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmNotice {
    pub tank_id: TankId,
    pub tank_name: String,
    pub level: f64,
    pub high_limit: f64,
}

/// Tracks the server-reported alarm flag per tank so a notice fires once per
/// rising edge instead of on every snapshot.
#[derive(Debug, Clone, Default)]
pub struct AlarmLatch {
    raised: HashMap<TankId, bool>,
}

impl AlarmLatch {
    pub fn observe(&mut self, id: &TankId, reading: &TankReading) -> Option<AlarmNotice> {
        let was_raised = self.raised.insert(id.clone(), reading.alarm_shown).unwrap_or(false);
        if !reading.alarm_shown || was_raised {
            return None;
        }

        Some(AlarmNotice {
            tank_id: id.clone(),
            tank_name: reading.display_name(id),
            level: reading.level.unwrap_or_default(),
            high_limit: reading.high_limit.unwrap_or_default(),
        })
    }
}
