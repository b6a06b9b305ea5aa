//! Connection-scoped traffic counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters for one connection
#[derive(Debug, Default)]
pub struct Statistics {
    sent: AtomicU64,
    received: AtomicU64,
    inbound_iterations: AtomicU64,
    dropped_frames: AtomicU64,
}

/// Point-in-time copy of [`Statistics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub inbound_iterations: u64,
    pub dropped_frames: u64,
}

impl Statistics {
    /// Messages written successfully
    pub fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Messages decoded by the inbound loop
    pub fn messages_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Iterations started by the inbound loop (diagnostic)
    pub fn inbound_iterations(&self) -> u64 {
        self.inbound_iterations.load(Ordering::Relaxed)
    }

    /// Malformed frames skipped by the inbound loop
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_sent: self.messages_sent(),
            messages_received: self.messages_received(),
            inbound_iterations: self.inbound_iterations(),
            dropped_frames: self.dropped_frames(),
        }
    }

    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_iteration(&self) {
        self.inbound_iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped_frames.fetch_add(1, Ordering::Relaxed);
    }
}
