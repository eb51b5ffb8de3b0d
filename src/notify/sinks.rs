use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::info;

use super::{NotificationSink, NotifyError, WorkflowEvent};

/// Writes each event to the structured log
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn emit(&self, event: WorkflowEvent) -> Result<(), NotifyError> {
        let payload =
            serde_json::to_string(&event).map_err(|e| NotifyError::Rejected(e.to_string()))?;
        info!(event_type = event.event_type(), %payload, "Workflow event");
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn emit(&self, _event: WorkflowEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Hands events to an async delivery task without waiting on it
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WorkflowEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn emit(&self, event: WorkflowEvent) -> Result<(), NotifyError> {
        self.tx.send(event).map_err(|_| NotifyError::ChannelClosed)
    }
}

/// Keeps every event in memory; handy for assertions and local tooling
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl NotificationSink for RecordingSink {
    fn emit(&self, event: WorkflowEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .map_err(|_| NotifyError::Rejected("recording sink poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorId, ProjectId};

    fn event() -> WorkflowEvent {
        WorkflowEvent::ProjectCreated {
            project_id: ProjectId::new(),
            quote_id: None,
            customer: ActorId::new("c1"),
        }
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::channel();
        let first = event();
        let second = event();
        sink.emit(first.clone()).unwrap();
        sink.emit(second.clone()).unwrap();
        assert_eq!(rx.recv().await, Some(first));
        assert_eq!(rx.recv().await, Some(second));
    }

    #[test]
    fn test_channel_sink_reports_closed_receiver() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        assert!(matches!(sink.emit(event()), Err(NotifyError::ChannelClosed)));
    }
}
