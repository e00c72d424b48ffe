// Event bus - Broadcast fan-out of frames, alarms and notices to connected clients
use crate::application::ports::{AlarmSink, Notifier, RenderSink, RevertPrompt};
use crate::domain::dashboard::{Dashboard, DashboardEvent};
use crate::domain::tank::AlarmNotice;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, oneshot};

const EVENT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, event: DashboardEvent) {
        // No subscribers is fine; the frame is rebuilt on connect.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSink for EventBus {
    fn render(&self, frame: &Dashboard) {
        self.publish(DashboardEvent::Frame(frame.clone()));
    }
}

impl AlarmSink for EventBus {
    fn raise(&self, notice: AlarmNotice) {
        self.publish(DashboardEvent::Alarm(notice));
    }
}

impl Notifier for EventBus {
    fn notify(&self, message: String) {
        self.publish(DashboardEvent::Notice(message));
    }
}

/// Revert prompt delivered over the event bus and answered through the HTTP API.
pub struct PromptBroker {
    bus: EventBus,
    timeout: Duration,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<bool>>>,
}

impl PromptBroker {
    pub fn new(bus: EventBus, timeout: Duration) -> Self {
        Self {
            bus,
            timeout,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `false` when the prompt is unknown, expired or already answered.
    pub async fn answer(&self, id: u64, confirm: bool) -> bool {
        match self.pending.lock().await.remove(&id) {
            Some(tx) => tx.send(confirm).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl RevertPrompt for PromptBroker {
    async fn confirm_return_to_live(&self) -> bool {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            // Prompts whose asking task was cancelled leave closed senders behind.
            pending.retain(|_, tx| !tx.is_closed());
            pending.insert(id, tx);
        }

        self.bus.publish(DashboardEvent::RevertPrompt {
            id,
            message: "Historical view is still shown. Return to live data?".to_string(),
        });

        let answer = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(confirm)) => confirm,
            Ok(Err(_)) => false,
            Err(_) => {
                tracing::debug!("Revert prompt {} expired", id);
                false
            }
        };
        self.pending.lock().await.remove(&id);
        answer
    }
}
