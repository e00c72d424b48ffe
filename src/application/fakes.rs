// In-memory port implementations for tests
use crate::application::ports::{AlarmSink, Notifier, RenderSink, RevertPrompt};
use crate::application::tank_repository::{SettingsStore, TankRepository};
use crate::domain::dashboard::Dashboard;
use crate::domain::tank::{AlarmNotice, TankId, TankSnapshot};
use crate::domain::telemetry::HistoryPoint;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct FakeBackend {
    tanks: Mutex<Option<TankSnapshot>>,
    history: HashMap<TankId, Result<Vec<HistoryPoint>, String>>,
    delays: HashMap<TankId, Duration>,
    history_calls: AtomicUsize,
    offsets: Mutex<Vec<(TankId, f64)>>,
    storage_days: AtomicU32,
    history_points: AtomicU32,
}

impl FakeBackend {
    pub fn with_tanks(self, snapshot: TankSnapshot) -> Self {
        *self.tanks.lock().unwrap() = Some(snapshot);
        self
    }

    pub fn with_history(mut self, id: TankId, points: usize) -> Self {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let points = (0..points)
            .map(|i| {
                HistoryPoint::new(
                    base + ChronoDuration::minutes(i as i64),
                    Some(150.0 + i as f64),
                    Some(3.0 + i as f64 / 10.0),
                )
            })
            .collect();
        self.history.insert(id, Ok(points));
        self
    }

    pub fn with_failure(mut self, id: TankId, message: &str) -> Self {
        self.history.insert(id, Err(message.to_string()));
        self
    }

    pub fn with_delay(mut self, id: TankId, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    pub fn set_tanks(&self, snapshot: Option<TankSnapshot>) {
        *self.tanks.lock().unwrap() = snapshot;
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn offsets(&self) -> Vec<(TankId, f64)> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl TankRepository for FakeBackend {
    async fn fetch_tanks(&self) -> anyhow::Result<TankSnapshot> {
        let tanks = self.tanks.lock().unwrap().clone();
        tanks.ok_or_else(|| anyhow::anyhow!("backend unreachable"))
    }

    async fn fetch_history(
        &self,
        tank_id: &TankId,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<HistoryPoint>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(tank_id) {
            tokio::time::sleep(*delay).await;
        }
        match self.history.get(tank_id) {
            Some(Ok(points)) => Ok(points.clone()),
            Some(Err(message)) => anyhow::bail!("{}", message),
            None => Ok(Vec::new()),
        }
    }

    async fn push_calibration_offset(&self, tank_id: &TankId, offset: f64) -> anyhow::Result<()> {
        self.offsets.lock().unwrap().push((tank_id.clone(), offset));
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FakeBackend {
    async fn storage_days(&self) -> anyhow::Result<u32> {
        Ok(self.storage_days.load(Ordering::SeqCst))
    }

    async fn set_storage_days(&self, days: u32) -> anyhow::Result<u32> {
        self.storage_days.store(days, Ordering::SeqCst);
        Ok(days)
    }

    async fn history_points(&self) -> anyhow::Result<u32> {
        Ok(self.history_points.load(Ordering::SeqCst))
    }

    async fn set_history_points(&self, points: u32) -> anyhow::Result<u32> {
        self.history_points.store(points, Ordering::SeqCst);
        Ok(points)
    }
}

/// Records everything sent towards the clients.
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Mutex<Vec<Dashboard>>,
    pub alarms: Mutex<Vec<AlarmNotice>>,
    pub notices: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn last_frame(&self) -> Option<Dashboard> {
        self.frames.lock().unwrap().last().cloned()
    }
}

impl RenderSink for RecordingSink {
    fn render(&self, frame: &Dashboard) {
        self.frames.lock().unwrap().push(frame.clone());
    }
}

impl AlarmSink for RecordingSink {
    fn raise(&self, notice: AlarmNotice) {
        self.alarms.lock().unwrap().push(notice);
    }
}

impl Notifier for RecordingSink {
    fn notify(&self, message: String) {
        self.notices.lock().unwrap().push(message);
    }
}

/// Answers every prompt with a fixed choice and counts how often it was asked.
pub struct ScriptedPrompt {
    answer: AtomicBool,
    asked: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: AtomicBool::new(answer),
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RevertPrompt for ScriptedPrompt {
    async fn confirm_return_to_live(&self) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer.load(Ordering::SeqCst)
    }
}
