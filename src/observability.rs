use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Workflow engine counters
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub transitions_committed: AtomicU64,
    pub claims_won: AtomicU64,
    pub claims_lost: AtomicU64,
    pub promotions_created: AtomicU64,
    pub promotions_replayed: AtomicU64,
    pub write_conflicts: AtomicU64,
    pub notification_failures: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_transition(&self) {
        self.transitions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_claim_won(&self) {
        self.claims_won.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_claim_lost(&self) {
        self.claims_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_promotion(&self, created: bool) {
        if created {
            self.promotions_created.fetch_add(1, Ordering::Relaxed);
        } else {
            self.promotions_replayed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_write_conflict(&self) {
        self.write_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_failure(&self) {
        self.notification_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WorkflowStats {
        WorkflowStats {
            transitions_committed: self.transitions_committed.load(Ordering::Relaxed),
            claims_won: self.claims_won.load(Ordering::Relaxed),
            claims_lost: self.claims_lost.load(Ordering::Relaxed),
            promotions_created: self.promotions_created.load(Ordering::Relaxed),
            promotions_replayed: self.promotions_replayed.load(Ordering::Relaxed),
            write_conflicts: self.write_conflicts.load(Ordering::Relaxed),
            notification_failures: self.notification_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.snapshot();
        info!(
            transitions = stats.transitions_committed,
            claims_won = stats.claims_won,
            claims_lost = stats.claims_lost,
            promotions_created = stats.promotions_created,
            promotions_replayed = stats.promotions_replayed,
            write_conflicts = stats.write_conflicts,
            notification_failures = stats.notification_failures,
            "Workflow metrics"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowStats {
    pub transitions_committed: u64,
    pub claims_won: u64,
    pub claims_lost: u64,
    pub promotions_created: u64,
    pub promotions_replayed: u64,
    pub write_conflicts: u64,
    pub notification_failures: u64,
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = WorkflowMetrics::new();
        metrics.record_claim_won();
        metrics.record_claim_lost();
        metrics.record_claim_lost();
        metrics.record_promotion(true);
        metrics.record_promotion(false);

        let stats = metrics.snapshot();
        assert_eq!(stats.claims_won, 1);
        assert_eq!(stats.claims_lost, 2);
        assert_eq!(stats.promotions_created, 1);
        assert_eq!(stats.promotions_replayed, 1);
        assert_eq!(stats.transitions_committed, 0);
    }
}
