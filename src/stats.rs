//! Per-channel throughput counters.
//!
//! Counters are plain atomics so the dispatch path never takes a lock to
//! record a message.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Thread-safe counters for one channel.
#[derive(Debug)]
pub struct ChannelStats {
    /// Reports handed to the dispatcher
    pub messages_seen: AtomicU64,

    /// Vessels this channel created in the directory
    pub vessels_created: AtomicU64,

    /// Lines or reports dropped because processing failed
    pub failures: AtomicU64,

    /// Lines skipped without decoding (banners, keepalives)
    pub ignored_lines: AtomicU64,

    /// When stats collection started
    start_time: Instant,
}

impl ChannelStats {
    pub fn new() -> Self {
        Self {
            messages_seen: AtomicU64::new(0),
            vessels_created: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            ignored_lines: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_message(&self) {
        self.messages_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_vessel_created(&self) {
        self.vessels_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages(&self) -> u64 {
        self.messages_seen.load(Ordering::Relaxed)
    }

    pub fn vessels(&self) -> u64 {
        self.vessels_created.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn messages_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.messages() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> ThroughputSummary {
        ThroughputSummary {
            elapsed_secs: self.elapsed().as_secs_f64(),
            messages_seen: self.messages(),
            vessels_created: self.vessels(),
            failures: self.failures.load(Ordering::Relaxed),
            ignored_lines: self.ignored_lines.load(Ordering::Relaxed),
            messages_per_second: self.messages_per_second(),
        }
    }
}

impl Default for ChannelStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a channel's counters.
#[derive(Debug, Clone, Serialize)]
pub struct ThroughputSummary {
    pub elapsed_secs: f64,
    pub messages_seen: u64,
    pub vessels_created: u64,
    pub failures: u64,
    pub ignored_lines: u64,
    pub messages_per_second: f64,
}

impl std::fmt::Display for ThroughputSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} messages, {} new vessels, {} failures in {:.0}s ({:.1} msg/s)",
            self.messages_seen,
            self.vessels_created,
            self.failures,
            self.elapsed_secs,
            self.messages_per_second
        )
    }
}
