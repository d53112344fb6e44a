use serde::Serialize;
use tokio::sync::mpsc;

/// Progress notifications emitted while a request runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    Thinking,
    Planned { steps: usize },
    ToolStarted { tool: String },
    ToolFinished { tool: String, ok: bool },
    Replanning,
    Synthesizing,
}

pub trait StatusSink: Send + Sync {
    /// Deliver an event. Delivery is best effort and must never block the
    /// pipeline.
    fn emit(&self, event: StatusEvent);
}

pub struct NullStatus;

impl StatusSink for NullStatus {
    fn emit(&self, _event: StatusEvent) {}
}

/// Forwards events to a bounded channel, dropping them when it is full or
/// closed.
pub struct ChannelStatus {
    tx: mpsc::Sender<StatusEvent>,
}

impl ChannelStatus {
    pub fn new(tx: mpsc::Sender<StatusEvent>) -> Self {
        Self { tx }
    }
}

impl StatusSink for ChannelStatus {
    fn emit(&self, event: StatusEvent) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::debug!(error = %e, "Dropped status event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_status_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = ChannelStatus::new(tx);
        sink.emit(StatusEvent::Thinking);
        sink.emit(StatusEvent::Synthesizing);

        assert_eq!(rx.try_recv().unwrap(), StatusEvent::Thinking);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_status_ignores_closed_receiver() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        ChannelStatus::new(tx).emit(StatusEvent::Replanning);
    }
}
