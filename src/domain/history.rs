// Historical query results and the replacement view built from them
use super::registry::EntityRegistry;
use super::tank::TankId;
use super::telemetry::{ChartData, Dataset, HistoryPoint, Metric};
use chrono::Local;

pub const HISTORY_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Settled fan-out result, one entry per requested tank in request order.
/// Failed tanks carry an empty sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryResults {
    entries: Vec<(TankId, Vec<HistoryPoint>)>,
}

impl HistoryResults {
    pub fn push(&mut self, id: TankId, points: Vec<HistoryPoint>) {
        self.entries.push((id, points));
    }

    #[cfg(test)]
    pub fn get(&self, id: &TankId) -> Option<&[HistoryPoint]> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, points)| points.as_slice())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(TankId, Vec<HistoryPoint>)> {
        self.entries.iter()
    }
}

/// Unwindowed dataset substituted for the live window while in historical mode.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalView {
    pub labels: Vec<String>,
    pub charts: Vec<ChartData>,
}

impl HistoricalView {
    /// The label axis comes from the first tank with any points. Other tanks are
    /// plotted by sample position against it, not re-aligned by timestamp; series
    /// are padded with gaps or truncated to the axis length. Tanks that are neither
    /// registered nor returned any point get no dataset.
    pub fn build(results: &HistoryResults, registry: &mut EntityRegistry) -> Self {
        let labels: Vec<String> = results
            .iter()
            .find(|(_, points)| !points.is_empty())
            .map(|(_, points)| {
                points
                    .iter()
                    .map(|p| {
                        p.timestamp
                            .with_timezone(&Local)
                            .format(HISTORY_LABEL_FORMAT)
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default();

        // Only tanks that returned data are registered; an empty answer for an
        // unknown id leaves no trace.
        for (id, points) in results.iter() {
            if !points.is_empty() {
                registry.ensure(id);
            }
        }

        let charts = Metric::ALL
            .iter()
            .map(|&metric| {
                let datasets = results
                    .iter()
                    .filter_map(|(id, points)| {
                        let record = registry.get(id)?;
                        let values = (0..labels.len())
                            .map(|i| points.get(i).and_then(|p| p.value(metric)))
                            .collect();
                        Some(Dataset {
                            tank_id: id.clone(),
                            color: record.color,
                            values,
                        })
                    })
                    .collect();
                ChartData::new(metric, datasets)
            })
            .collect();

        Self { labels, charts }
    }
}
