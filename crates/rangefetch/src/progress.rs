//! Aggregate progress for one download job.
//!
//! Fetchers credit received bytes to a shared [`ProgressCounter`]; the
//! coordinator forwards deltas and lifecycle events to an optional channel so
//! callers can render progress without polling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::segmenter::SegmentState;

/// Lock-free running total of bytes received for one job. Never reset; a new
/// job gets a new counter.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    bytes: AtomicU64,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `n` bytes; returns the new total.
    pub fn add(&self, n: u64) -> u64 {
        self.bytes.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn total(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Snapshot of job progress.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    pub bytes_done: u64,
    pub total_bytes: u64,
    pub elapsed: Duration,
}

impl ProgressStats {
    /// Bytes per second since the job started (0 if no time has passed).
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / secs
    }

    /// Estimated seconds remaining (None while the rate is still 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Lifecycle and progress notifications for one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Started {
        file_name: String,
        total_size: u64,
        segment_count: usize,
    },
    /// `delta` new bytes were credited; `total` is the running counter value.
    Progress { delta: u64, total: u64 },
    SegmentFinished { index: usize, state: SegmentState },
    Finished {
        file_name: String,
        total_size: u64,
        elapsed: Duration,
        success: bool,
    },
}

/// Optional event channel. Send failures (receiver dropped) are ignored.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink(Option<UnboundedSender<JobEvent>>);

impl EventSink {
    pub fn new(tx: Option<UnboundedSender<JobEvent>>) -> Self {
        Self(tx)
    }

    pub fn send(&self, event: JobEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }
}
