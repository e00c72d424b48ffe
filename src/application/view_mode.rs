// View mode controller - Live/Historical state machine with snapshot and restore
use crate::domain::dashboard::{Dashboard, ViewMode};
use crate::domain::history::HistoricalView;
use crate::domain::registry::EntityRegistry;
use crate::domain::telemetry::TileData;
use crate::domain::window::{HistoricalSnapshot, LiveAggregate};
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::future::Future;
use tokio::task::JoinHandle;

/// What "return to live" shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestorePolicy {
    /// The live aggregate as it stands now, including ticks ingested during the detour.
    #[default]
    Current,
    /// The snapshot taken on entry; ticks ingested during the detour are dropped.
    Frozen,
}

/// Handle of a deferred action. Dropping or cancelling it aborts the task.
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Releases the task without aborting it; used by the task on itself.
    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

enum ViewState {
    Live,
    Historical {
        snapshot: HistoricalSnapshot,
        /// `None` until the fan-out of this session settles.
        view: Option<HistoricalView>,
        revert_deadline: Option<DateTime<Local>>,
    },
}

/// Switches the rendered dataset between the live window and a historical
/// overlay. Every session entry bumps a generation number; results and timers
/// carrying an older generation are ignored.
pub struct ViewModeController {
    state: ViewState,
    generation: u64,
    policy: RestorePolicy,
    revert_task: Option<ScheduledTask>,
}

impl ViewModeController {
    pub fn new(policy: RestorePolicy) -> Self {
        Self {
            state: ViewState::Live,
            generation: 0,
            policy,
            revert_task: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && matches!(self.state, ViewState::Historical { .. })
    }

    pub fn mode(&self) -> ViewMode {
        match &self.state {
            ViewState::Live => ViewMode::Live,
            ViewState::Historical { view: None, .. } => ViewMode::Loading,
            ViewState::Historical { view: Some(_), .. } => ViewMode::Historical,
        }
    }

    pub fn revert_deadline(&self) -> Option<DateTime<Local>> {
        match &self.state {
            ViewState::Historical { revert_deadline, .. } => *revert_deadline,
            ViewState::Live => None,
        }
    }

    /// Starts a historical session and returns its generation. Any earlier
    /// session's snapshot and pending revert prompt are discarded.
    pub fn enter_historical(&mut self, live: &LiveAggregate) -> u64 {
        self.cancel_revert();
        if matches!(self.state, ViewState::Historical { .. }) {
            tracing::debug!("Dropping snapshot of historical session {}", self.generation);
        }

        self.generation += 1;
        self.state = ViewState::Historical {
            snapshot: live.snapshot(),
            view: None,
            revert_deadline: None,
        };
        self.generation
    }

    /// Installs the fan-out result if it belongs to the current session.
    pub fn apply_history(&mut self, generation: u64, result: HistoricalView) -> bool {
        if !self.is_current(generation) {
            tracing::warn!(
                "Discarding stale historical result (generation {}, current {})",
                generation,
                self.generation
            );
            return false;
        }

        if let ViewState::Historical { view, .. } = &mut self.state {
            *view = Some(result);
        }
        true
    }

    /// Keeps the one-shot revert timer of the current session. A stale task is
    /// aborted immediately.
    pub fn arm_revert(
        &mut self,
        generation: u64,
        deadline: DateTime<Local>,
        task: ScheduledTask,
    ) -> bool {
        if !self.is_current(generation) {
            task.cancel();
            return false;
        }

        if let ViewState::Historical {
            revert_deadline, ..
        } = &mut self.state
        {
            *revert_deadline = Some(deadline);
        }
        self.cancel_revert();
        self.revert_task = Some(task);
        true
    }

    /// Returns to live. With [`RestorePolicy::Frozen`] the live aggregate is
    /// reset to the snapshot taken on entry.
    pub fn restore(&mut self, live: &mut LiveAggregate) -> bool {
        self.cancel_revert();
        match std::mem::replace(&mut self.state, ViewState::Live) {
            ViewState::Live => false,
            ViewState::Historical { snapshot, .. } => {
                self.generation += 1;
                if self.policy == RestorePolicy::Frozen {
                    *live = snapshot.into_aggregate();
                }
                tracing::info!("Restored live view ({:?})", self.policy);
                true
            }
        }
    }

    /// Called from the revert task after the user confirmed.
    pub fn confirm_revert(&mut self, generation: u64, live: &mut LiveAggregate) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        if let Some(task) = self.revert_task.take() {
            task.detach();
        }
        self.restore(live)
    }

    pub fn frame(
        &self,
        live: &LiveAggregate,
        registry: &EntityRegistry,
        tiles: Vec<TileData>,
    ) -> Dashboard {
        match &self.state {
            ViewState::Live => Dashboard::from_aggregate(ViewMode::Live, live, registry, tiles),
            ViewState::Historical {
                view: Some(view), ..
            } => Dashboard::from_history(view, tiles),
            ViewState::Historical { snapshot, .. } => {
                Dashboard::from_aggregate(ViewMode::Loading, snapshot.aggregate(), registry, tiles)
            }
        }
    }

    fn cancel_revert(&mut self) {
        if let Some(task) = self.revert_task.take() {
            task.cancel();
        }
    }
}
