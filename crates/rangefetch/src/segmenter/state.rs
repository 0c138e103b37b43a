//! Per-segment runtime state.

use super::Segment;
use std::fmt;

/// Lifecycle of one segment. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentState {
    #[default]
    Pending,
    InFlight,
    Retrying,
    Done,
    Failed,
}

impl SegmentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SegmentState::Done | SegmentState::Failed)
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SegmentState::Pending => "pending",
            SegmentState::InFlight => "in-flight",
            SegmentState::Retrying => "retrying",
            SegmentState::Done => "done",
            SegmentState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A planned segment plus what happened to it. Owned and mutated by the fetcher
/// that runs the segment; the coordinator only sees the final value.
#[derive(Debug, Clone)]
pub struct SegmentStatus {
    pub segment: Segment,
    /// Longest prefix of this segment any attempt has written, failed ones included.
    pub bytes_received: u64,
    /// Attempts started so far (0 while pending).
    pub attempts: u32,
    pub state: SegmentState,
}

impl SegmentStatus {
    pub fn new(segment: Segment) -> Self {
        Self {
            segment,
            bytes_received: 0,
            attempts: 0,
            state: SegmentState::Pending,
        }
    }

    /// Move to `to`, logging the transition. Terminal states are never left.
    pub(crate) fn transition(&mut self, to: SegmentState) {
        if self.state.is_terminal() || self.state == to {
            return;
        }
        tracing::trace!(segment = self.segment.index, from = %self.state, to = %to, "segment state");
        self.state = to;
    }
}
