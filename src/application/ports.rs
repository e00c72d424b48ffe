// Outbound ports towards the dashboard clients
use crate::domain::dashboard::Dashboard;
use crate::domain::tank::AlarmNotice;
use async_trait::async_trait;

/// Redraws both charts from a frame. Must tolerate redundant calls.
pub trait RenderSink: Send + Sync {
    fn render(&self, frame: &Dashboard);
}

pub trait AlarmSink: Send + Sync {
    fn raise(&self, notice: AlarmNotice);
}

/// User-visible notifications (failed fetches and the like).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: String);
}

#[async_trait]
pub trait RevertPrompt: Send + Sync {
    /// Asks whether to return to the live view. No answer counts as `false`.
    async fn confirm_return_to_live(&self) -> bool;
}
