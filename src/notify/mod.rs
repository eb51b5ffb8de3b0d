//! Notification Emitter - best-effort side channel for committed changes
//!
//! The engine publishes a [`WorkflowEvent`] after every committed transition.
//! Sinks must not block: delivery (email, SMS, push) happens elsewhere, and a
//! sink failure is logged and swallowed, never surfaced as a workflow error.

pub mod sinks;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{ProjectStatus, QuoteStatus};
use crate::model::{ActorId, ProjectId, QuoteId};
use crate::observability::WorkflowMetrics;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

pub use sinks::{ChannelSink, LogSink, NullSink, RecordingSink};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    QuoteStatusChanged {
        quote_id: QuoteId,
        status: QuoteStatus,
        requester: ActorId,
    },
    ProjectCreated {
        project_id: ProjectId,
        quote_id: Option<QuoteId>,
        customer: ActorId,
    },
    ProjectStatusChanged {
        project_id: ProjectId,
        status: ProjectStatus,
        customer: ActorId,
        technician: Option<ActorId>,
    },
    QuotePromoted {
        quote_id: QuoteId,
        project_id: ProjectId,
        customer: ActorId,
    },
}

impl WorkflowEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::QuoteStatusChanged { .. } => "quote_status_changed",
            WorkflowEvent::ProjectCreated { .. } => "project_created",
            WorkflowEvent::ProjectStatusChanged { .. } => "project_status_changed",
            WorkflowEvent::QuotePromoted { .. } => "quote_promoted",
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel closed")]
    ChannelClosed,
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Where events go. Implementations must return promptly (enqueue, don't deliver).
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait NotificationSink: Send + Sync {
    fn emit(&self, event: WorkflowEvent) -> Result<(), NotifyError>;
}

/// Fire-and-forget wrapper the managers publish through
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    metrics: Arc<WorkflowMetrics>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, metrics: Arc<WorkflowMetrics>) -> Self {
        Self { sink, metrics }
    }

    pub fn publish(&self, event: WorkflowEvent) {
        let event_type = event.event_type();
        match self.sink.emit(event) {
            Ok(()) => debug!(event_type, "Notification emitted"),
            Err(e) => {
                self.metrics.record_notification_failure();
                warn!(event_type, error = %e, "Notification failed; transition stays committed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_carries_type_tag() {
        let event = WorkflowEvent::QuoteStatusChanged {
            quote_id: QuoteId::new(),
            status: QuoteStatus::Approved,
            requester: ActorId::new("c1"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["status"], "approved");
        assert_eq!(json["requester"], "c1");
    }

    #[test]
    fn test_publish_swallows_sink_failure() {
        let mut sink = MockNotificationSink::new();
        sink.expect_emit()
            .times(1)
            .returning(|_| Err(NotifyError::Rejected("smtp down".to_string())));

        let metrics = Arc::new(WorkflowMetrics::new());
        let notifier = Notifier::new(Arc::new(sink), metrics.clone());
        notifier.publish(WorkflowEvent::ProjectCreated {
            project_id: ProjectId::new(),
            quote_id: None,
            customer: ActorId::new("c1"),
        });

        assert_eq!(metrics.snapshot().notification_failures, 1);
    }
}
