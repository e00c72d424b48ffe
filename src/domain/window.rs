// Sliding-window live aggregate shared by every tank
use super::registry::EntityRegistry;
use super::tank::TankId;
use super::telemetry::{ChartData, Dataset, Metric};
use std::collections::{HashMap, VecDeque};

/// Values aligned 1:1 with the label axis; `None` marks a tick without a sample.
pub type Series = VecDeque<Option<f64>>;

#[derive(Debug, Clone, Default, PartialEq)]
struct TankSeries {
    temperature: Series,
    level: Series,
}

impl TankSeries {
    fn backfilled(len: usize) -> Self {
        Self {
            temperature: std::iter::repeat_n(None, len).collect(),
            level: std::iter::repeat_n(None, len).collect(),
        }
    }

    fn get(&self, metric: Metric) -> &Series {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Level => &self.level,
        }
    }

    fn get_mut(&mut self, metric: Metric) -> &mut Series {
        match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Level => &mut self.level,
        }
    }

    fn all_mut(&mut self) -> [&mut Series; 2] {
        [&mut self.temperature, &mut self.level]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub new_column: bool,
    pub evicted: usize,
}

/// One label axis plus a window per (tank, metric).
///
/// Every series always has exactly `labels.len()` elements, and the axis never
/// grows past `max_window`.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveAggregate {
    max_window: usize,
    labels: VecDeque<String>,
    series: HashMap<TankId, TankSeries>,
}

impl LiveAggregate {
    pub fn new(max_window: usize) -> Self {
        Self {
            max_window: max_window.max(1),
            labels: VecDeque::with_capacity(max_window + 1),
            series: HashMap::new(),
        }
    }

    pub fn max_window(&self) -> usize {
        self.max_window
    }

    pub fn labels(&self) -> &VecDeque<String> {
        &self.labels
    }

    #[cfg(test)]
    pub fn series(&self, id: &TankId, metric: Metric) -> Option<&Series> {
        self.series.get(id).map(|s| s.get(metric))
    }

    /// Ingests one tick of samples stamped with `label`.
    ///
    /// A label equal to the trailing one updates that column in place. Tanks seen
    /// for the first time are registered and backfilled with gaps.
    pub fn append<'a, I>(
        &mut self,
        label: &str,
        samples: I,
        registry: &mut EntityRegistry,
    ) -> AppendOutcome
    where
        I: IntoIterator<Item = (&'a TankId, Metric, f64)>,
    {
        let new_column = self.labels.back().map(String::as_str) != Some(label);
        if new_column {
            self.labels.push_back(label.to_string());
            for tank in self.series.values_mut() {
                for series in tank.all_mut() {
                    series.push_back(None);
                }
            }
        }

        let len = self.labels.len();
        for (id, metric, value) in samples {
            registry.ensure(id);
            let tank = self
                .series
                .entry(id.clone())
                .or_insert_with(|| TankSeries::backfilled(len));
            if let Some(slot) = tank.get_mut(metric).back_mut() {
                *slot = Some(value);
            }
        }

        let evicted = self.evict();
        debug_assert!(self.is_aligned());

        AppendOutcome {
            new_column,
            evicted,
        }
    }

    /// Drops the oldest column from the axis and from every series together.
    fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.labels.len() > self.max_window {
            self.labels.pop_front();
            for tank in self.series.values_mut() {
                for series in tank.all_mut() {
                    series.pop_front();
                }
            }
            evicted += 1;
        }
        evicted
    }

    pub fn is_aligned(&self) -> bool {
        let len = self.labels.len();
        self.series
            .values()
            .all(|t| t.temperature.len() == len && t.level.len() == len)
    }

    pub fn snapshot(&self) -> HistoricalSnapshot {
        HistoricalSnapshot {
            aggregate: self.clone(),
        }
    }

    /// Datasets for one metric in registry order.
    pub fn chart(&self, metric: Metric, registry: &EntityRegistry) -> ChartData {
        let datasets = registry
            .records()
            .iter()
            .filter_map(|record| {
                self.series.get(&record.id).map(|tank| Dataset {
                    tank_id: record.id.clone(),
                    color: record.color,
                    values: tank.get(metric).iter().copied().collect(),
                })
            })
            .collect();
        ChartData::new(metric, datasets)
    }
}

/// Frozen copy of the live aggregate taken when a historical session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSnapshot {
    aggregate: LiveAggregate,
}

impl HistoricalSnapshot {
    pub fn aggregate(&self) -> &LiveAggregate {
        &self.aggregate
    }

    pub fn into_aggregate(self) -> LiveAggregate {
        self.aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tick(
        aggregate: &mut LiveAggregate,
        registry: &mut EntityRegistry,
        label: &str,
        samples: &[(TankId, Metric, f64)],
    ) -> AppendOutcome {
        aggregate.append(label, samples.iter().map(|(id, m, v)| (id, *m, *v)), registry)
    }

    #[test]
    fn test_window_evicts_oldest_tick() {
        let mut registry = EntityRegistry::new();
        let mut aggregate = LiveAggregate::new(30);
        let tank = TankId::from(1);

        for t in 1..=31 {
            let label = format!("t{}", t);
            tick(&mut aggregate, &mut registry, &label, &[(tank.clone(), Metric::Temperature, t as f64)]);
        }

        assert_eq!(aggregate.labels().len(), 30);
        assert_eq!(aggregate.labels().front().map(String::as_str), Some("t2"));
        let series = aggregate.series(&tank, Metric::Temperature).unwrap();
        assert_eq!(series.front(), Some(&Some(2.0)));
        assert_eq!(series.back(), Some(&Some(31.0)));
        assert!(aggregate.is_aligned());
    }

    #[test]
    fn test_late_tank_is_backfilled() {
        let mut registry = EntityRegistry::new();
        let mut aggregate = LiveAggregate::new(30);
        let a = TankId::from("A");
        let b = TankId::from("B");

        tick(&mut aggregate, &mut registry, "t1", &[(a.clone(), Metric::Level, 1.0)]);
        tick(&mut aggregate, &mut registry, "t2", &[(b.clone(), Metric::Level, 2.0)]);

        let b_series: Vec<_> = aggregate.series(&b, Metric::Level).unwrap().iter().copied().collect();
        assert_eq!(b_series, vec![None, Some(2.0)]);
        let a_series: Vec<_> = aggregate.series(&a, Metric::Level).unwrap().iter().copied().collect();
        assert_eq!(a_series, vec![Some(1.0), None]);
        assert_eq!(registry.get(&b).unwrap().index, 1);
    }

    #[test]
    fn test_same_label_overwrites_in_place() {
        let mut registry = EntityRegistry::new();
        let mut aggregate = LiveAggregate::new(30);
        let tank = TankId::from(1);

        let first = tick(&mut aggregate, &mut registry, "10:00:00", &[(tank.clone(), Metric::Temperature, 150.0)]);
        let second = tick(&mut aggregate, &mut registry, "10:00:00", &[(tank.clone(), Metric::Temperature, 151.5)]);

        assert!(first.new_column);
        assert!(!second.new_column);
        assert_eq!(aggregate.labels().len(), 1);
        let series = aggregate.series(&tank, Metric::Temperature).unwrap();
        assert_eq!(series.iter().copied().collect::<Vec<_>>(), vec![Some(151.5)]);
    }

    #[test]
    fn test_unreported_metric_stays_absent() {
        let mut registry = EntityRegistry::new();
        let mut aggregate = LiveAggregate::new(5);
        let tank = TankId::from(4);

        tick(&mut aggregate, &mut registry, "t1", &[(tank.clone(), Metric::Temperature, 130.0)]);

        let level = aggregate.series(&tank, Metric::Level).unwrap();
        assert_eq!(level.iter().copied().collect::<Vec<_>>(), vec![None]);
    }

    #[test]
    fn test_eviction_applies_to_every_series() {
        let mut registry = EntityRegistry::new();
        let mut aggregate = LiveAggregate::new(2);
        let a = TankId::from(1);
        let b = TankId::from(2);

        tick(&mut aggregate, &mut registry, "t1", &[(a.clone(), Metric::Level, 1.0)]);
        tick(&mut aggregate, &mut registry, "t2", &[(b.clone(), Metric::Level, 2.0)]);
        let outcome = tick(&mut aggregate, &mut registry, "t3", &[]);

        assert_eq!(outcome.evicted, 1);
        for id in [&a, &b] {
            for metric in Metric::ALL {
                assert_eq!(aggregate.series(id, metric).unwrap().len(), 2);
            }
        }
        let b_level: Vec<_> = aggregate.series(&b, Metric::Level).unwrap().iter().copied().collect();
        assert_eq!(b_level, vec![Some(2.0), None]);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut registry = EntityRegistry::new();
        let mut aggregate = LiveAggregate::new(30);
        let tank = TankId::from(1);
        tick(&mut aggregate, &mut registry, "t1", &[(tank.clone(), Metric::Level, 1.0)]);

        let snapshot = aggregate.snapshot();
        tick(&mut aggregate, &mut registry, "t2", &[(tank.clone(), Metric::Level, 2.0)]);

        assert_eq!(snapshot.aggregate().labels().len(), 1);
        assert_eq!(aggregate.labels().len(), 2);
    }

    #[test]
    fn test_chart_follows_registry_order() {
        let mut registry = EntityRegistry::new();
        let mut aggregate = LiveAggregate::new(30);
        tick(
            &mut aggregate,
            &mut registry,
            "t1",
            &[
                (TankId::from(9), Metric::Temperature, 1.0),
                (TankId::from(2), Metric::Temperature, 2.0),
            ],
        );

        let chart = aggregate.chart(Metric::Temperature, &registry);
        let ids: Vec<&str> = chart.datasets.iter().map(|d| d.tank_id.as_str()).collect();
        assert_eq!(ids, vec!["9", "2"]);
        assert_eq!(chart.datasets[0].color, registry.records()[0].color);
    }

    proptest! {
        #[test]
        fn prop_alignment_and_window_bound(
            max_window in 1usize..8,
            ticks in proptest::collection::vec(
                (0u8..6, proptest::collection::vec((0u32..5, any::<bool>(), -50.0f64..200.0), 0..4)),
                0..40,
            ),
        ) {
            let mut registry = EntityRegistry::new();
            let mut aggregate = LiveAggregate::new(max_window);

            for (label, samples) in ticks {
                let samples: Vec<(TankId, Metric, f64)> = samples
                    .into_iter()
                    .map(|(id, temp, v)| {
                        let metric = if temp { Metric::Temperature } else { Metric::Level };
                        (TankId::from(id), metric, v)
                    })
                    .collect();
                tick(&mut aggregate, &mut registry, &format!("t{}", label), &samples);

                prop_assert!(aggregate.labels().len() <= max_window);
                prop_assert!(aggregate.is_aligned());
            }
        }
    }
}
