use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// SessionMetrics
// ---------------------------------------------------------------------------

/// Atomic per-node counters for a coding session.
/// Counters use Relaxed ordering throughout.
pub struct SessionMetrics {
    pub name: &'static str,

    // Payload flow
    pub payloads_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    /// Payloads dropped by the simulated channel.
    pub payloads_lost: AtomicU64,
    pub payloads_delivered: AtomicU64,
    /// Delivered payloads that did not raise the receiver's rank.
    pub payloads_redundant: AtomicU64,
    pub payloads_recoded: AtomicU64,

    // Feedback
    pub feedback_sent: AtomicU64,
    pub feedback_lost: AtomicU64,

    /// Payloads delivered when the generation completed; 0 until then.
    pub completed_after: AtomicU64,
}

/// Plain-struct snapshot of SessionMetrics for reports (no atomics).
#[derive(Debug, Clone, Serialize)]
pub struct SessionMetricsSnapshot {
    pub name: &'static str,
    pub payloads_sent: u64,
    pub bytes_sent: u64,
    pub payloads_lost: u64,
    pub payloads_delivered: u64,
    pub payloads_redundant: u64,
    pub payloads_recoded: u64,
    pub feedback_sent: u64,
    pub feedback_lost: u64,
    pub completed_after: Option<u64>,
}

impl SessionMetrics {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            payloads_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            payloads_lost: AtomicU64::new(0),
            payloads_delivered: AtomicU64::new(0),
            payloads_redundant: AtomicU64::new(0),
            payloads_recoded: AtomicU64::new(0),
            feedback_sent: AtomicU64::new(0),
            feedback_lost: AtomicU64::new(0),
            completed_after: AtomicU64::new(0),
        })
    }

    pub fn record_sent(&self, bytes: usize) {
        self.payloads_sent.fetch_add(1, Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Relaxed);
    }

    /// Record that the receiver finished; only the first call sticks.
    pub fn record_complete(&self) {
        let delivered = self.payloads_delivered.load(Relaxed);
        let _ = self
            .completed_after
            .compare_exchange(0, delivered, Relaxed, Relaxed);
    }

    /// Observed channel loss as a percentage, or None if nothing was sent.
    pub fn loss_pct(&self) -> Option<f64> {
        let sent = self.payloads_sent.load(Relaxed);
        if sent == 0 {
            return None;
        }
        Some(self.payloads_lost.load(Relaxed) as f64 / sent as f64 * 100.0)
    }

    /// Share of delivered payloads that were innovative, or None if no data.
    pub fn useful_pct(&self) -> Option<f64> {
        let delivered = self.payloads_delivered.load(Relaxed);
        if delivered == 0 {
            return None;
        }
        let redundant = self.payloads_redundant.load(Relaxed);
        Some(delivered.saturating_sub(redundant) as f64 / delivered as f64 * 100.0)
    }

    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        let completed_after = self.completed_after.load(Relaxed);
        SessionMetricsSnapshot {
            name: self.name,
            payloads_sent: self.payloads_sent.load(Relaxed),
            bytes_sent: self.bytes_sent.load(Relaxed),
            payloads_lost: self.payloads_lost.load(Relaxed),
            payloads_delivered: self.payloads_delivered.load(Relaxed),
            payloads_redundant: self.payloads_redundant.load(Relaxed),
            payloads_recoded: self.payloads_recoded.load(Relaxed),
            feedback_sent: self.feedback_sent.load(Relaxed),
            feedback_lost: self.feedback_lost.load(Relaxed),
            completed_after: (completed_after > 0).then_some(completed_after),
        }
    }
}
