// Ingest service - Poll loop and push entry point feeding the dashboard
use crate::application::dashboard_service::DashboardService;
use crate::application::tank_repository::TankRepository;
use crate::domain::tank::TankSnapshot;
use crate::domain::window::AppendOutcome;
use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedStatus {
    pub connected: bool,
    pub last_ingest: Option<DateTime<Local>>,
}

#[derive(Clone)]
pub struct IngestService {
    repository: Arc<dyn TankRepository>,
    dashboard: DashboardService,
    connected: Arc<AtomicBool>,
    last_ingest_ms: Arc<AtomicI64>,
}

impl IngestService {
    pub fn new(repository: Arc<dyn TankRepository>, dashboard: DashboardService) -> Self {
        Self {
            repository,
            dashboard,
            connected: Arc::new(AtomicBool::new(false)),
            last_ingest_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Applies one snapshot, from either the poll loop or a push.
    pub async fn accept(&self, snapshot: TankSnapshot) -> AppendOutcome {
        if !self.connected.swap(true, Ordering::SeqCst) {
            tracing::info!("Tank feed connected");
        }
        if snapshot.is_empty() {
            tracing::debug!("Tank snapshot carries no readings");
        }
        self.last_ingest_ms
            .store(Local::now().timestamp_millis(), Ordering::SeqCst);
        self.dashboard.ingest(snapshot).await
    }

    /// A failed fetch only flips the feed status; the buffer keeps its last state.
    pub async fn poll_once(&self) -> bool {
        match self.repository.fetch_tanks().await {
            Ok(snapshot) => {
                self.accept(snapshot).await;
                true
            }
            Err(e) => {
                if self.connected.swap(false, Ordering::SeqCst) {
                    tracing::warn!("Tank feed disconnected: {:#}", e);
                } else {
                    tracing::debug!("Tank feed still unavailable: {:#}", e);
                }
                false
            }
        }
    }

    pub async fn run_polling(self, every: Duration) {
        tracing::info!("Polling tank feed every {:?}", every);
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.poll_once().await;
        }
    }

    pub fn status(&self) -> FeedStatus {
        let last_ms = self.last_ingest_ms.load(Ordering::SeqCst);
        FeedStatus {
            connected: self.connected.load(Ordering::SeqCst),
            last_ingest: (last_ms > 0)
                .then(|| Local.timestamp_millis_opt(last_ms).single())
                .flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::DashboardState;
    use crate::application::fakes::{FakeBackend, RecordingSink, ScriptedPrompt};
    use crate::application::history_service::HistoryAggregator;
    use crate::application::view_mode::RestorePolicy;
    use crate::domain::tank::{TankId, TankReading};

    fn service(backend: Arc<FakeBackend>) -> (IngestService, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let dashboard = DashboardService::new(
            DashboardState::new(30, RestorePolicy::Current),
            HistoryAggregator::new(backend.clone()),
            sink.clone(),
            sink.clone(),
            sink.clone(),
            Arc::new(ScriptedPrompt::answering(false)),
            Duration::from_secs(30),
        );
        (IngestService::new(backend, dashboard), sink)
    }

    #[tokio::test]
    async fn test_disconnect_keeps_last_buffer() {
        let snapshot = TankSnapshot::new(vec![(
            TankId::from(1),
            TankReading {
                temperature: Some(150.0),
                ..Default::default()
            },
        )]);
        let backend = Arc::new(FakeBackend::default().with_tanks(snapshot));
        let (ingest, sink) = service(backend.clone());

        assert!(ingest.poll_once().await);
        assert!(ingest.status().connected);
        assert!(ingest.status().last_ingest.is_some());

        backend.set_tanks(None);
        assert!(!ingest.poll_once().await);

        let status = ingest.status();
        assert!(!status.connected);
        assert!(status.last_ingest.is_some());
        assert_eq!(sink.frames.lock().unwrap().len(), 1);
        assert_eq!(sink.last_frame().unwrap().labels.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_runs_on_interval() {
        let backend = Arc::new(FakeBackend::default().with_tanks(TankSnapshot::default()));
        let (ingest, sink) = service(backend);

        let poller = tokio::spawn(ingest.clone().run_polling(Duration::from_secs(30)));
        tokio::time::sleep(Duration::from_secs(61)).await;
        poller.abort();

        assert_eq!(sink.frames.lock().unwrap().len(), 3);
    }
}
