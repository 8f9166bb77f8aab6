//! Observability stubs (metrics, tracing)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters/gauges
#[derive(Debug, Default)]
pub struct Metrics {
    tasks_created: AtomicU64,
    tasks_started: AtomicU64,
    tasks_succeeded: AtomicU64,
    tasks_failed: AtomicU64,
    credits_debited: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks_created(&self, count: u64) {
        self.tasks_created.fetch_add(count, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_created", count, "Metric incremented");
    }

    pub fn task_started(&self) {
        self.tasks_started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_started", "Metric incremented");
    }

    pub fn task_succeeded(&self) {
        self.tasks_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_succeeded", "Metric incremented");
    }

    pub fn task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_failed", "Metric incremented");
    }

    pub fn credits_debited(&self, amount: u64) {
        self.credits_debited.fetch_add(amount, Ordering::Relaxed);
        tracing::debug!(counter = "credits_debited", amount, "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_created: self.tasks_created.load(Ordering::Relaxed),
            tasks_started: self.tasks_started.load(Ordering::Relaxed),
            tasks_succeeded: self.tasks_succeeded.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            credits_debited: self.credits_debited.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tasks_created: u64,
    pub tasks_started: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub credits_debited: u64,
}
