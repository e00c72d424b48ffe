// Dashboard service - Owns the core state and drives ingestion, history and view mode
use crate::application::history_service::{FanIn, HistoryAggregator, HistoryRange};
use crate::application::ports::{AlarmSink, Notifier, RenderSink, RevertPrompt};
use crate::application::view_mode::{RestorePolicy, ScheduledTask, ViewModeController};
use crate::domain::dashboard::{Dashboard, ViewMode};
use crate::domain::history::HistoricalView;
use crate::domain::registry::EntityRegistry;
use crate::domain::tank::{AlarmLatch, AlarmNotice, TankId, TankReading, TankSnapshot};
use crate::domain::telemetry::TileData;
use crate::domain::window::{AppendOutcome, LiveAggregate};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const LIVE_LABEL_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryScope {
    Tank(TankId),
    All,
}

/// Mutable core state. Only touched while the service mutex is held, and the
/// mutex is never held across an await point.
pub struct DashboardState {
    registry: EntityRegistry,
    live: LiveAggregate,
    view: ViewModeController,
    latest: BTreeMap<TankId, TankReading>,
    alarms: AlarmLatch,
}

impl DashboardState {
    pub fn new(max_window: usize, policy: RestorePolicy) -> Self {
        Self {
            registry: EntityRegistry::new(),
            live: LiveAggregate::new(max_window),
            view: ViewModeController::new(policy),
            latest: BTreeMap::new(),
            alarms: AlarmLatch::default(),
        }
    }

    fn ingest(&mut self, label: &str, snapshot: TankSnapshot) -> (AppendOutcome, Vec<AlarmNotice>) {
        let outcome = self.live.append(label, snapshot.samples(), &mut self.registry);

        let mut notices = Vec::new();
        for (id, reading) in snapshot.readings {
            notices.extend(self.alarms.observe(&id, &reading));
            self.latest.insert(id, reading);
        }
        (outcome, notices)
    }

    fn tiles(&self) -> Vec<TileData> {
        self.latest
            .iter()
            .map(|(id, reading)| TileData::from_reading(id, reading))
            .collect()
    }

    fn frame(&self) -> Dashboard {
        self.view.frame(&self.live, &self.registry, self.tiles())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewStatus {
    pub mode: ViewMode,
    pub generation: u64,
    pub tanks: usize,
    pub window_len: usize,
    pub max_window: usize,
    pub revert_deadline: Option<DateTime<Local>>,
}

#[derive(Clone)]
pub struct DashboardService {
    state: Arc<Mutex<DashboardState>>,
    history: HistoryAggregator,
    render: Arc<dyn RenderSink>,
    alarms: Arc<dyn AlarmSink>,
    notifier: Arc<dyn Notifier>,
    prompt: Arc<dyn RevertPrompt>,
    revert_after: Duration,
}

impl DashboardService {
    pub fn new(
        state: DashboardState,
        history: HistoryAggregator,
        render: Arc<dyn RenderSink>,
        alarms: Arc<dyn AlarmSink>,
        notifier: Arc<dyn Notifier>,
        prompt: Arc<dyn RevertPrompt>,
        revert_after: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            history,
            render,
            alarms,
            notifier,
            prompt,
            revert_after,
        }
    }

    /// Ingests a snapshot stamped with the current local time.
    pub async fn ingest(&self, snapshot: TankSnapshot) -> AppendOutcome {
        let label = Local::now().format(LIVE_LABEL_FORMAT).to_string();
        self.ingest_at(&label, snapshot).await
    }

    /// Live data keeps flowing into the window while a historical view is shown;
    /// it is just not rendered until the view returns to live.
    pub async fn ingest_at(&self, label: &str, snapshot: TankSnapshot) -> AppendOutcome {
        let (outcome, notices, frame) = {
            let mut state = self.state.lock().await;
            let (outcome, notices) = state.ingest(label, snapshot);
            let frame = (state.view.mode() == ViewMode::Live).then(|| state.frame());
            (outcome, notices, frame)
        };

        tracing::debug!(
            "Ingested tick {} (new column: {}, evicted: {})",
            label,
            outcome.new_column,
            outcome.evicted
        );

        for notice in notices {
            tracing::warn!(
                "High level alarm on {}: {} > {}",
                notice.tank_name,
                notice.level,
                notice.high_limit
            );
            self.alarms.raise(notice);
        }
        if let Some(frame) = frame {
            self.render.render(&frame);
        }
        outcome
    }

    /// Enters historical mode for one tank or for every known tank.
    ///
    /// Returns the rendered frame, or `None` when a newer session or a restore
    /// superseded this one while its queries were in flight. The fan-out runs in
    /// its own task, so the session settles even if the caller stops waiting.
    pub async fn query_history(
        &self,
        scope: HistoryScope,
        range: HistoryRange,
        keep_live: bool,
    ) -> Option<Dashboard> {
        let (generation, tank_ids, loading) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let generation = state.view.enter_historical(&state.live);
            let tank_ids = match &scope {
                HistoryScope::Tank(id) => vec![id.clone()],
                HistoryScope::All => state.registry.ids(),
            };
            (generation, tank_ids, state.frame())
        };
        tracing::info!(
            "Historical session {} started for {} tank(s)",
            generation,
            tank_ids.len()
        );
        self.render.render(&loading);

        let service = self.clone();
        let session = tokio::spawn(async move {
            service
                .settle_session(generation, scope, tank_ids, range, keep_live)
                .await
        });

        match session.await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Historical session {} failed: {}", generation, e);
                None
            }
        }
    }

    async fn settle_session(
        &self,
        generation: u64,
        scope: HistoryScope,
        tank_ids: Vec<TankId>,
        range: HistoryRange,
        keep_live: bool,
    ) -> Option<Dashboard> {
        let fan_in = match &scope {
            HistoryScope::Tank(id) => {
                let outcome = self.history.query_one(id, &range).await;
                let mut fan_in = FanIn::default();
                fan_in.results.push(id.clone(), outcome.points);
                fan_in.errors.extend(outcome.error);
                fan_in
            }
            HistoryScope::All => self.history.query_all(&tank_ids, &range).await,
        };

        for error in &fan_in.errors {
            self.notifier.notify(error.to_string());
        }

        let frame = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            if !state.view.is_current(generation) {
                tracing::warn!("Dropping results of superseded historical session {}", generation);
                return None;
            }

            let view = HistoricalView::build(&fan_in.results, &mut state.registry);
            state.view.apply_history(generation, view);
            if keep_live {
                let deadline = Local::now()
                    + chrono::Duration::from_std(self.revert_after)
                        .unwrap_or_else(|_| chrono::Duration::zero());
                let task = self.schedule_revert(generation);
                state.view.arm_revert(generation, deadline, task);
            }
            state.frame()
        };

        self.render.render(&frame);
        Some(frame)
    }

    fn schedule_revert(&self, generation: u64) -> ScheduledTask {
        let service = self.clone();
        ScheduledTask::spawn(async move {
            tokio::time::sleep(service.revert_after).await;
            if !service.prompt.confirm_return_to_live().await {
                tracing::info!("Staying in historical session {}", generation);
                return;
            }

            let frame = {
                let mut guard = service.state.lock().await;
                let state = &mut *guard;
                if !state.view.confirm_revert(generation, &mut state.live) {
                    return;
                }
                state.frame()
            };
            service.render.render(&frame);
        })
    }

    /// Explicit return to live.
    pub async fn restore_live(&self) -> Dashboard {
        let (restored, frame) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let restored = state.view.restore(&mut state.live);
            (restored, state.frame())
        };
        if restored {
            self.render.render(&frame);
        }
        frame
    }

    pub async fn frame(&self) -> Dashboard {
        self.state.lock().await.frame()
    }

    pub async fn status(&self) -> ViewStatus {
        let state = self.state.lock().await;
        ViewStatus {
            mode: state.view.mode(),
            generation: state.view.generation(),
            tanks: state.registry.len(),
            window_len: state.live.labels().len(),
            max_window: state.live.max_window(),
            revert_deadline: state.view.revert_deadline(),
        }
    }

    /// Last reported reading of a tank, if it ever reported.
    pub async fn latest_reading(&self, tank_id: &TankId) -> Option<TankReading> {
        self.state.lock().await.latest.get(tank_id).cloned()
    }
}
